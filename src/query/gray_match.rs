use super::QueryContext;
use super::QueryOutcome;
use super::QueryResolver;
use super::ResolvedConfig;
use super::VariantInfo;
use crate::gray::select_variant;
use crate::GrayRule;

/// Serves a gray variant when one of the key's rules matches the client labels.
#[derive(Debug, Default)]
pub struct GrayRuleMatchResolver;

impl QueryResolver for GrayRuleMatchResolver {
    fn name(&self) -> &'static str {
        "grayRuleMatch"
    }

    fn can_handle(
        &self,
        ctx: &QueryContext<'_>,
    ) -> bool {
        ctx.snapshot
            .map(|s| select_variant(&s.variants, &ctx.request.labels).is_some())
            .unwrap_or(false)
    }

    fn handle(
        &self,
        ctx: &QueryContext<'_>,
    ) -> QueryOutcome {
        let Some(snapshot) = ctx.snapshot else {
            return QueryOutcome::NotFound;
        };
        let Some(variant) = select_variant(&snapshot.variants, &ctx.request.labels) else {
            return QueryOutcome::NotFound;
        };
        let Some(content) = ctx.store.gray_content(&ctx.request.key, &variant.name) else {
            return QueryOutcome::NotFound;
        };

        let info = match variant.rule {
            GrayRule::Beta(_) => VariantInfo::Beta(variant.clone()),
            GrayRule::Tag(_) => VariantInfo::Tag(variant.clone()),
        };

        QueryOutcome::Resolved(ResolvedConfig {
            content,
            fingerprint: variant.fingerprint.clone(),
            last_modified: variant.last_modified,
            content_type: snapshot.content_type.clone(),
            encrypted_data_key: variant.encrypted_data_key.clone(),
            variant: info,
        })
    }
}
