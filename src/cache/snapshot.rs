use crate::GrayVariant;

/// Cached state of one key as seen by readers.
///
/// Snapshots are immutable once published; a write replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// MD5 of the default content
    pub fingerprint: String,
    pub content_type: String,
    /// Epoch millis
    pub last_modified: u64,
    pub encrypted_data_key: Option<String>,
    /// Sorted by priority, highest first; equal priorities keep write order.
    pub variants: Vec<GrayVariant>,
}

impl ConfigSnapshot {
    pub fn new(
        fingerprint: impl Into<String>,
        content_type: impl Into<String>,
        last_modified: u64,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            content_type: content_type.into(),
            last_modified,
            encrypted_data_key: None,
            variants: Vec::new(),
        }
    }

    pub fn variant(
        &self,
        name: &str,
    ) -> Option<&GrayVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Inserts or replaces the variant called `variant.name`.
    ///
    /// A rewritten variant moves behind every other variant of the same
    /// priority, so on ties the last written one is visited last.
    pub fn upsert_variant(
        &mut self,
        variant: GrayVariant,
    ) {
        self.variants.retain(|v| v.name != variant.name);
        self.variants.push(variant);
        // stable: preserves write order among equal priorities
        self.variants.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn remove_variant(
        &mut self,
        name: &str,
    ) -> Option<GrayVariant> {
        let index = self.variants.iter().position(|v| v.name == name)?;
        Some(self.variants.remove(index))
    }
}
