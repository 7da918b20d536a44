use tracing::trace;

use super::GrayRule;
use super::GrayVariant;
use crate::ClientLabels;

/// Picks the gray variant applying to `labels`.
///
/// Variants are visited in stored order and every match overwrites the
/// previous one: the last matching variant wins, not the highest priority
/// one. Returns `None` when no rule matches and the default content applies.
pub fn select_variant<'a>(
    variants: &'a [GrayVariant],
    labels: &ClientLabels,
) -> Option<&'a GrayVariant> {
    let mut selected = None;
    for variant in variants {
        if variant.matches(labels) {
            selected = Some(variant);
        }
    }

    if let Some(variant) = selected {
        trace!(variant = %variant.name, kind = variant.rule.kind(), "Gray variant selected");
    }
    selected
}

/// True when some tag rule among `variants` carries `tag`.
pub fn has_tag_variant(
    variants: &[GrayVariant],
    tag: &str,
) -> bool {
    variants
        .iter()
        .any(|v| matches!(&v.rule, GrayRule::Tag(rule) if rule.tag() == tag))
}
