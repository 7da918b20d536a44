use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::constants::ANY_PATTERN;
use crate::constants::DEFAULT_NAMESPACE;
use crate::constants::KEY_SEPARATOR;
use crate::ConfigKey;
use crate::PatternError;

/// Matcher for one key segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentMatcher {
    /// No wildcard: exact equality
    Exact(String),
    /// `*`
    Any,
    /// `*text*`
    Contains(String),
    /// `text*`
    Prefix(String),
    /// `*text`
    Suffix(String),
}

impl SegmentMatcher {
    fn compile(
        segment: &str,
        original: &str,
    ) -> Result<Self, PatternError> {
        if !segment.contains(ANY_PATTERN) {
            return Ok(Self::Exact(segment.to_string()));
        }
        if segment == ANY_PATTERN {
            return Ok(Self::Any);
        }

        let starts = segment.starts_with(ANY_PATTERN);
        let ends = segment.ends_with(ANY_PATTERN);
        let text = segment.trim_start_matches(ANY_PATTERN).trim_end_matches(ANY_PATTERN);

        // Wildcards are only allowed at the segment boundaries.
        if text.contains(ANY_PATTERN) {
            return Err(PatternError::MalformedPattern(format!(
                "{original}: wildcard inside segment `{segment}`"
            )));
        }

        Ok(match (starts, ends) {
            (true, true) => Self::Contains(text.to_string()),
            (false, true) => Self::Prefix(text.to_string()),
            (true, false) => Self::Suffix(text.to_string()),
            (false, false) => unreachable!("segment contains a wildcard"),
        })
    }

    pub fn matches(
        &self,
        value: &str,
    ) -> bool {
        match self {
            Self::Exact(expected) => expected == value,
            Self::Any => true,
            Self::Contains(text) => value.contains(text.as_str()),
            Self::Prefix(text) => value.starts_with(text.as_str()),
            Self::Suffix(text) => value.ends_with(text.as_str()),
        }
    }
}

/// Compiled wildcard subscription over (namespace, group, resource id).
///
/// The namespace segment is always an exact match. Never mutated once built.
#[derive(Clone, PartialEq, Eq)]
pub struct WatchPattern {
    text: Arc<str>,
    namespace: String,
    group: SegmentMatcher,
    resource: SegmentMatcher,
}

impl WatchPattern {
    /// Compiles a pattern from its three segments.
    ///
    /// A blank namespace becomes the default namespace; blank group or
    /// resource segments are rejected.
    pub fn compile(
        namespace: &str,
        group_pattern: &str,
        resource_pattern: &str,
    ) -> Result<Self, PatternError> {
        let namespace = if namespace.trim().is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };
        let text = [namespace, group_pattern, resource_pattern].join(KEY_SEPARATOR);

        if group_pattern.trim().is_empty() {
            return Err(PatternError::MalformedPattern(format!("{text}: group pattern is blank")));
        }
        if resource_pattern.trim().is_empty() {
            return Err(PatternError::MalformedPattern(format!(
                "{text}: resource pattern is blank"
            )));
        }
        if [namespace, group_pattern, resource_pattern]
            .iter()
            .any(|s| s.contains(KEY_SEPARATOR))
        {
            return Err(PatternError::MalformedPattern(format!(
                "{text}: segment contains reserved separator"
            )));
        }

        Ok(Self {
            group: SegmentMatcher::compile(group_pattern, &text)?,
            resource: SegmentMatcher::compile(resource_pattern, &text)?,
            namespace: namespace.to_string(),
            text: Arc::from(text),
        })
    }

    /// Compiles the canonical `namespace>>group>>resource` form.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let parts: Vec<&str> = text.split(KEY_SEPARATOR).collect();
        match parts.as_slice() {
            [namespace, group, resource] => Self::compile(namespace, group, resource),
            _ => Err(PatternError::MalformedPattern(format!(
                "{text}: expected namespace, group and resource segments"
            ))),
        }
    }

    /// Canonical text of `text` without compiling it: a blank namespace is
    /// replaced by the default one. Text that is not three segments comes
    /// back unchanged and fails later in [`WatchPattern::parse`].
    pub fn canonical(text: &str) -> Cow<'_, str> {
        let mut parts = text.split(KEY_SEPARATOR);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(group), Some(resource), None) if namespace.trim().is_empty() => {
                Cow::Owned([DEFAULT_NAMESPACE, group, resource].join(KEY_SEPARATOR))
            }
            _ => Cow::Borrowed(text),
        }
    }

    /// Interned canonical text.
    pub fn text(&self) -> &Arc<str> {
        &self.text
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn matches(
        &self,
        key: &ConfigKey,
    ) -> bool {
        self.namespace == key.namespace()
            && self.group.matches(key.group())
            && self.resource.matches(key.resource_id())
    }
}

impl fmt::Debug for WatchPattern {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "WatchPattern({})", self.text)
    }
}

/// Returns the canonical text of every pattern matching `key`.
pub fn filter_matched_patterns<'a, I>(
    patterns: I,
    key: &ConfigKey,
) -> HashSet<Arc<str>>
where
    I: IntoIterator<Item = &'a WatchPattern>,
{
    patterns
        .into_iter()
        .filter(|p| p.matches(key))
        .map(|p| p.text().clone())
        .collect()
}

/// Deduplicating table of compiled patterns.
///
/// Identical pattern text from different subscribers resolves to the same
/// `Arc<WatchPattern>`, so each distinct pattern is compiled once.
#[derive(Debug, Default)]
pub struct PatternInterner {
    patterns: DashMap<Arc<str>, Arc<WatchPattern>>,
}

impl PatternInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(
        &self,
        pattern: WatchPattern,
    ) -> Arc<WatchPattern> {
        let text = pattern.text().clone();
        let entry = self.patterns.entry(text).or_insert_with(|| {
            trace!(pattern = %pattern.text(), "Pattern compiled and interned");
            Arc::new(pattern)
        });
        entry.value().clone()
    }

    pub fn intern_text(
        &self,
        text: &str,
    ) -> Result<Arc<WatchPattern>, PatternError> {
        let text = WatchPattern::canonical(text);
        if let Some(existing) = self.patterns.get(text.as_ref()) {
            return Ok(existing.value().clone());
        }
        Ok(self.intern(WatchPattern::parse(&text)?))
    }

    pub fn get(
        &self,
        text: &str,
    ) -> Option<Arc<WatchPattern>> {
        self.patterns.get(text).map(|p| p.value().clone())
    }

    pub fn release(
        &self,
        text: &str,
    ) -> Option<Arc<WatchPattern>> {
        self.patterns.remove(text).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Free-function form of [`WatchPattern::matches`].
pub fn matches(
    pattern: &WatchPattern,
    key: &ConfigKey,
) -> bool {
    pattern.matches(key)
}
