//! Error hierarchy for the configuration query and notification core.
//!
//! Every error here is a per-request outcome. Nothing is fatal to the process:
//! callers map these onto their transport's status codes.

use config::ConfigError;

use crate::ConfigKey;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Read-side resolution failures
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Wildcard watch registration failures
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Write-side failures
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Long polling request failures
    #[error(transparent)]
    Poll(#[from] PollError),

    /// Configuration loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Key component is blank or contains the reserved separator
    #[error("Invalid config key: {0}")]
    InvalidKey(String),

    /// Gray rule kind or expression could not be parsed
    #[error("Invalid gray rule `{kind}`: {reason}")]
    InvalidGrayRule { kind: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// No snapshot exists for the key
    #[error("config data not exist: {0}")]
    NotFound(ConfigKey),

    /// Write guard still held after the bounded retry; retry later
    #[error("requested config {0} is being modified, please try later")]
    Conflict(ConfigKey),

    /// An explicit tag was requested but no variant carries it
    #[error("tag `{tag}` not found for config {key}")]
    TagNotFound { key: ConfigKey, tag: String },
}

impl QueryError {
    /// Conflicts are transient; everything else is a definitive answer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::Conflict(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// Pattern is missing a required segment
    #[error("Malformed watch pattern: {0}")]
    MalformedPattern(String),

    /// Registry already tracks the configured maximum of patterns
    #[error("Fuzzy watch pattern limit {limit} reached")]
    PatternLimitExceeded { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// Compare-and-swap publish found a different current fingerprint
    #[error("CAS publish rejected for {key}: expected md5 {expected}, current {actual:?}")]
    CasMismatch {
        key: ConfigKey,
        expected: String,
        actual: Option<String>,
    },

    /// Could not obtain the key's write guard within the retry budget
    #[error("Write guard for {0} is busy")]
    WriteConflict(ConfigKey),

    /// Gray variant removal referenced an unknown variant
    #[error("Gray variant `{name}` does not exist for {key}")]
    MissingVariant { key: ConfigKey, name: String },

    /// Published content must not be empty
    #[error("Content for {0} is empty")]
    EmptyContent(ConfigKey),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    /// A poll must watch at least one key
    #[error("Poll request watches no keys")]
    EmptyWatchSet,
}
