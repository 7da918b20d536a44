use tracing::info;

use crate::ConfigKey;

/// One pull event, handed to the audit/trace collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub key: ConfigKey,
    pub client_ip: Option<String>,
    /// Fingerprint served, `None` when nothing was found
    pub fingerprint: Option<String>,
    /// Gray variant served, if any
    pub variant: Option<String>,
    /// `pull`, `pull-<variant>` or `pull-tag-<tag>`
    pub event: String,
    /// `ok` or `not-found`
    pub pull_type: &'static str,
    /// Millis between publish and this pull; `-1` when unknown or notify-driven
    pub delay_ms: i64,
    pub notify: bool,
}

#[cfg(test)]
use mockall::automock;

/// Sink receiving pull trace records. Emission must not block the read path.
#[cfg_attr(test, automock)]
pub trait TraceSink: Send + Sync + 'static {
    fn emit(
        &self,
        record: TraceRecord,
    );
}

/// Default sink: one structured `tracing` event per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn emit(
        &self,
        record: TraceRecord,
    ) {
        info!(
            target: "confhub::trace",
            key = %record.key,
            client_ip = record.client_ip.as_deref().unwrap_or("-"),
            md5 = record.fingerprint.as_deref().unwrap_or("-"),
            variant = record.variant.as_deref().unwrap_or("-"),
            event = %record.event,
            pull_type = record.pull_type,
            delay_ms = record.delay_ms,
            notify = record.notify,
            "config pulled"
        );
    }
}
