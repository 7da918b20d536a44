use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constants::CLIENT_IP_LABEL;
use crate::constants::DEFAULT_NAMESPACE;
use crate::constants::KEY_SEPARATOR;
use crate::constants::TAG_LABEL;
use crate::Error;
use crate::Result;

/// Identity of one configuration item: (namespace, group, resource id).
///
/// Cheap to clone; the canonical `namespace>>group>>resourceId` form is built
/// once at construction and reused for hashing-free flat comparisons.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey {
    inner: Arc<KeyParts>,
}

#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
struct KeyParts {
    namespace: String,
    group: String,
    resource_id: String,
    group_key: String,
}

impl ConfigKey {
    /// Builds a key, substituting the default namespace when `namespace` is blank.
    ///
    /// # Errors
    /// `Error::InvalidKey` when group or resource id is blank, or when any
    /// segment contains the reserved separator.
    pub fn new(
        namespace: &str,
        group: &str,
        resource_id: &str,
    ) -> Result<Self> {
        let namespace = if namespace.trim().is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };

        if group.trim().is_empty() {
            return Err(Error::InvalidKey("group is blank".into()));
        }
        if resource_id.trim().is_empty() {
            return Err(Error::InvalidKey("resource id is blank".into()));
        }
        for segment in [namespace, group, resource_id] {
            if segment.contains(KEY_SEPARATOR) {
                return Err(Error::InvalidKey(format!(
                    "segment `{segment}` contains reserved separator `{KEY_SEPARATOR}`"
                )));
            }
        }

        let group_key = [namespace, group, resource_id].join(KEY_SEPARATOR);
        Ok(Self {
            inner: Arc::new(KeyParts {
                namespace: namespace.to_string(),
                group: group.to_string(),
                resource_id: resource_id.to_string(),
                group_key,
            }),
        })
    }

    /// Parses the canonical `namespace>>group>>resourceId` form.
    pub fn parse(group_key: &str) -> Result<Self> {
        let parts: Vec<&str> = group_key.split(KEY_SEPARATOR).collect();
        match parts.as_slice() {
            [namespace, group, resource_id] => Self::new(namespace, group, resource_id),
            _ => Err(Error::InvalidKey(format!(
                "`{group_key}` is not a three segment group key"
            ))),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn group(&self) -> &str {
        &self.inner.group
    }

    pub fn resource_id(&self) -> &str {
        &self.inner.resource_id
    }

    /// Canonical flat form, used wherever keys are compared as strings.
    pub fn group_key(&self) -> &str {
        &self.inner.group_key
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.group_key())
    }
}

impl fmt::Debug for ConfigKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "ConfigKey({})", self.group_key())
    }
}

/// Client attribute labels matched by gray rules (`clientIp`, `tag`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientLabels {
    labels: HashMap<String, String>,
}

impl ClientLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels for a read request. An explicit `tag` wins over the `auto_tag`
    /// attribute some clients attach on every request.
    pub fn for_request(
        client_ip: &str,
        tag: Option<&str>,
        auto_tag: Option<&str>,
    ) -> Self {
        let mut labels = Self::new().with_client_ip(client_ip);
        let tag = tag
            .filter(|t| !t.trim().is_empty())
            .or_else(|| auto_tag.filter(|t| !t.trim().is_empty()));
        if let Some(tag) = tag {
            labels = labels.with_tag(tag);
        }
        labels
    }

    pub fn with_client_ip(
        self,
        ip: &str,
    ) -> Self {
        self.with_label(CLIENT_IP_LABEL, ip)
    }

    pub fn with_tag(
        self,
        tag: &str,
    ) -> Self {
        self.with_label(TAG_LABEL, tag)
    }

    pub fn with_label(
        mut self,
        name: &str,
        value: &str,
    ) -> Self {
        self.labels.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn client_ip(&self) -> Option<&str> {
        self.get(CLIENT_IP_LABEL)
    }

    pub fn tag(&self) -> Option<&str> {
        self.get(TAG_LABEL)
    }
}
