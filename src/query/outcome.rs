use bytes::Bytes;

use crate::ClientLabels;
use crate::ConfigKey;
use crate::GrayVariant;
use crate::QueryError;

/// Read request as seen by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub key: ConfigKey,
    pub labels: ClientLabels,
    /// Tag explicitly asked for by the client
    pub requested_tag: Option<String>,
    /// The pull was triggered by a change notification
    pub notify: bool,
}

impl QueryRequest {
    pub fn new(
        key: ConfigKey,
        labels: ClientLabels,
    ) -> Self {
        Self {
            key,
            labels,
            requested_tag: None,
            notify: false,
        }
    }

    /// Sets the requested tag and mirrors it into the labels so tag rules see it.
    pub fn with_requested_tag(
        mut self,
        tag: impl Into<String>,
    ) -> Self {
        let tag = tag.into();
        self.labels = self.labels.with_tag(&tag);
        self.requested_tag = Some(tag);
        self
    }

    pub fn with_notify(
        mut self,
        notify: bool,
    ) -> Self {
        self.notify = notify;
        self
    }

    pub(crate) fn explicit_tag(&self) -> Option<&str> {
        self.requested_tag.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Which variant of the content was served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantInfo {
    None,
    Beta(GrayVariant),
    Tag(GrayVariant),
    /// An explicit tag matched no variant; default content was served
    TagNotFound(String),
}

impl VariantInfo {
    pub fn variant_name(&self) -> Option<&str> {
        match self {
            VariantInfo::Beta(v) | VariantInfo::Tag(v) => Some(v.name.as_str()),
            VariantInfo::None | VariantInfo::TagNotFound(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub content: Bytes,
    pub fingerprint: String,
    pub last_modified: u64,
    pub content_type: String,
    pub encrypted_data_key: Option<String>,
    pub variant: VariantInfo,
}

/// Terminal state of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    NotFound,
    /// Write guard busy after the bounded retry; retry later
    Conflict,
    Resolved(ResolvedConfig),
}

impl QueryOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            QueryOutcome::NotFound => "not_found",
            QueryOutcome::Conflict => "conflict",
            QueryOutcome::Resolved(resolved) => match resolved.variant {
                VariantInfo::None => "resolved",
                VariantInfo::Beta(_) => "beta",
                VariantInfo::Tag(_) => "tag",
                VariantInfo::TagNotFound(_) => "tag_not_found",
            },
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedConfig> {
        match self {
            QueryOutcome::Resolved(resolved) => Some(resolved),
            _ => None,
        }
    }

    /// Maps the outcome onto the error taxonomy. `TAG_NOT_FOUND` becomes
    /// `QueryError::TagNotFound` so callers can report it distinctly.
    pub fn into_result(
        self,
        key: &ConfigKey,
    ) -> Result<ResolvedConfig, QueryError> {
        match self {
            QueryOutcome::NotFound => Err(QueryError::NotFound(key.clone())),
            QueryOutcome::Conflict => Err(QueryError::Conflict(key.clone())),
            QueryOutcome::Resolved(ResolvedConfig {
                variant: VariantInfo::TagNotFound(tag),
                ..
            }) => Err(QueryError::TagNotFound {
                key: key.clone(),
                tag,
            }),
            QueryOutcome::Resolved(resolved) => Ok(resolved),
        }
    }
}
