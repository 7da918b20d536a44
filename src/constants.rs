// -
// Key layout

/// Separator joining the three key segments into the canonical group key
pub const KEY_SEPARATOR: &str = ">>";

/// Universal wildcard inside watch pattern segments
pub const ANY_PATTERN: &str = "*";

/// Namespace substituted whenever the namespace segment is blank
pub const DEFAULT_NAMESPACE: &str = "public";

pub const DEFAULT_GROUP: &str = "DEFAULT_GROUP";

// -
// Client labels consumed by gray rules

pub const CLIENT_IP_LABEL: &str = "clientIp";
pub const TAG_LABEL: &str = "tag";

// -
// Gray rule kinds

pub const BETA_RULE_TYPE: &str = "beta";
pub const TAG_RULE_TYPE: &str = "tag";

/// Default priorities. Beta outranks tag when both are published.
pub const BETA_RULE_PRIORITY: i32 = i32::MAX;
pub const TAG_RULE_PRIORITY: i32 = i32::MAX - 1;

/// Gray variant name used for the beta rule
pub const BETA_VARIANT_NAME: &str = "beta";
/// Prefix of the gray variant name generated for a tag rule
pub const TAG_VARIANT_PREFIX: &str = "tag_";

// -
// Pull trace

pub(crate) const PULL_EVENT: &str = "pull";
pub(crate) const PULL_TYPE_OK: &str = "ok";
pub(crate) const PULL_TYPE_NOT_FOUND: &str = "not-found";

// -
// History op types

pub(crate) const OP_INSERT: &str = "I";
pub(crate) const OP_UPDATE: &str = "U";
pub(crate) const OP_DELETE: &str = "D";
