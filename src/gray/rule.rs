use std::collections::BTreeSet;

use crate::constants::BETA_RULE_PRIORITY;
use crate::constants::BETA_RULE_TYPE;
use crate::constants::TAG_RULE_PRIORITY;
use crate::constants::TAG_RULE_TYPE;
use crate::ClientLabels;
use crate::Error;
use crate::Result;

/// Serves a variant to an explicit allow-list of client IPs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetaRule {
    allowed_client_ips: BTreeSet<String>,
}

impl BetaRule {
    pub fn new<I, S>(ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_client_ips: ips.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allowed_client_ips(&self) -> &BTreeSet<String> {
        &self.allowed_client_ips
    }

    pub fn matches(
        &self,
        labels: &ClientLabels,
    ) -> bool {
        labels
            .client_ip()
            .map(|ip| self.allowed_client_ips.contains(ip))
            .unwrap_or(false)
    }
}

/// Serves a variant to clients carrying a given tag label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    tag: String,
}

impl TagRule {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn matches(
        &self,
        labels: &ClientLabels,
    ) -> bool {
        labels.tag() == Some(self.tag.as_str())
    }
}

/// Predicate selecting which clients see a gray variant.
///
/// New rule kinds are added as variants; `#[non_exhaustive]` keeps downstream
/// matches honest about that.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GrayRule {
    Beta(BetaRule),
    Tag(TagRule),
}

impl GrayRule {
    /// Builds a rule from its kind and raw expression.
    ///
    /// `beta` takes a comma separated IP list, `tag` takes the tag label.
    pub fn parse(
        kind: &str,
        raw_expression: &str,
    ) -> Result<Self> {
        match kind {
            BETA_RULE_TYPE => {
                let ips: Vec<&str> = raw_expression
                    .split(',')
                    .map(str::trim)
                    .filter(|ip| !ip.is_empty())
                    .collect();
                if ips.is_empty() {
                    return Err(Error::InvalidGrayRule {
                        kind: kind.to_string(),
                        reason: "IP allow-list is empty".into(),
                    });
                }
                Ok(GrayRule::Beta(BetaRule::new(ips)))
            }
            TAG_RULE_TYPE => {
                let tag = raw_expression.trim();
                if tag.is_empty() {
                    return Err(Error::InvalidGrayRule {
                        kind: kind.to_string(),
                        reason: "tag label is blank".into(),
                    });
                }
                Ok(GrayRule::Tag(TagRule::new(tag)))
            }
            other => Err(Error::InvalidGrayRule {
                kind: other.to_string(),
                reason: "unknown rule kind".into(),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GrayRule::Beta(_) => BETA_RULE_TYPE,
            GrayRule::Tag(_) => TAG_RULE_TYPE,
        }
    }

    /// Expression the rule was built from, as reported back to clients.
    pub fn raw_expression(&self) -> String {
        match self {
            GrayRule::Beta(rule) => rule
                .allowed_client_ips
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(","),
            GrayRule::Tag(rule) => rule.tag.clone(),
        }
    }

    pub fn default_priority(&self) -> i32 {
        match self {
            GrayRule::Beta(_) => BETA_RULE_PRIORITY,
            GrayRule::Tag(_) => TAG_RULE_PRIORITY,
        }
    }

    pub fn matches(
        &self,
        labels: &ClientLabels,
    ) -> bool {
        match self {
            GrayRule::Beta(rule) => rule.matches(labels),
            GrayRule::Tag(rule) => rule.matches(labels),
        }
    }
}

/// Alternate content served to clients selected by `rule`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayVariant {
    pub name: String,
    /// MD5 of the variant content
    pub fingerprint: String,
    /// Epoch millis
    pub last_modified: u64,
    pub rule: GrayRule,
    pub priority: i32,
    pub encrypted_data_key: Option<String>,
}

impl GrayVariant {
    pub fn matches(
        &self,
        labels: &ClientLabels,
    ) -> bool {
        self.rule.matches(labels)
    }
}
