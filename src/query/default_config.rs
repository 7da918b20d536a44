use super::QueryContext;
use super::QueryOutcome;
use super::QueryResolver;
use super::ResolvedConfig;
use super::VariantInfo;

/// Serves the default published content of any key that has a snapshot.
#[derive(Debug, Default)]
pub struct DefaultConfigResolver;

impl QueryResolver for DefaultConfigResolver {
    fn name(&self) -> &'static str {
        "defaultConfig"
    }

    fn can_handle(
        &self,
        ctx: &QueryContext<'_>,
    ) -> bool {
        ctx.snapshot.is_some()
    }

    fn handle(
        &self,
        ctx: &QueryContext<'_>,
    ) -> QueryOutcome {
        let Some(snapshot) = ctx.snapshot else {
            return QueryOutcome::NotFound;
        };
        let Some(content) = ctx.store.content(&ctx.request.key) else {
            return QueryOutcome::NotFound;
        };

        // The gray resolver runs first, so an explicit tag reaching this
        // point matched no variant.
        let variant = match ctx.request.explicit_tag() {
            Some(tag) => VariantInfo::TagNotFound(tag.to_string()),
            None => VariantInfo::None,
        };

        QueryOutcome::Resolved(ResolvedConfig {
            content,
            fingerprint: snapshot.fingerprint.clone(),
            last_modified: snapshot.last_modified,
            content_type: snapshot.content_type.clone(),
            encrypted_data_key: snapshot.encrypted_data_key.clone(),
            variant,
        })
    }
}
