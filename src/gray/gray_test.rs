use super::*;
use crate::ClientLabels;
use crate::Error;

fn variant(
    name: &str,
    rule: GrayRule,
    priority: i32,
) -> GrayVariant {
    GrayVariant {
        name: name.to_string(),
        fingerprint: format!("md5-{name}"),
        last_modified: 1,
        rule,
        priority,
        encrypted_data_key: None,
    }
}

#[test]
fn beta_rule_matches_allow_listed_ip_only() {
    let rule = GrayRule::parse("beta", "10.0.0.5, 10.0.0.7").unwrap();

    assert!(rule.matches(&ClientLabels::new().with_client_ip("10.0.0.5")));
    assert!(!rule.matches(&ClientLabels::new().with_client_ip("10.0.0.6")));
    assert!(!rule.matches(&ClientLabels::new()));
    assert_eq!(rule.raw_expression(), "10.0.0.5,10.0.0.7");
}

#[test]
fn tag_rule_matches_equal_tag_only() {
    let rule = GrayRule::parse("tag", "v2").unwrap();

    assert!(rule.matches(&ClientLabels::new().with_tag("v2")));
    assert!(!rule.matches(&ClientLabels::new().with_tag("v3")));
    assert_eq!(rule.kind(), "tag");
}

#[test]
fn parse_rejects_unknown_kind_and_empty_expressions() {
    assert!(matches!(
        GrayRule::parse("canary", "x"),
        Err(Error::InvalidGrayRule { .. })
    ));
    assert!(GrayRule::parse("beta", " , ").is_err());
    assert!(GrayRule::parse("tag", "").is_err());
}

#[test]
fn select_variant_returns_none_without_match() {
    let variants = vec![
        variant("beta", GrayRule::Beta(BetaRule::new(["10.0.0.5"])), 10),
        variant("tag_v2", GrayRule::Tag(TagRule::new("v2")), 9),
    ];
    let labels = ClientLabels::new().with_client_ip("10.0.0.6").with_tag("v1");

    assert!(select_variant(&variants, &labels).is_none());
    assert!(select_variant(&[], &labels).is_none());
}

#[test]
fn select_variant_last_match_wins_over_priority() {
    // Both rules match; the higher priority variant is stored first but the
    // later one in iteration order must be returned.
    let variants = vec![
        variant("beta", GrayRule::Beta(BetaRule::new(["10.0.0.5"])), 100),
        variant("tag_v2", GrayRule::Tag(TagRule::new("v2")), 1),
    ];
    let labels = ClientLabels::new().with_client_ip("10.0.0.5").with_tag("v2");

    let selected = select_variant(&variants, &labels).unwrap();
    assert_eq!(selected.name, "tag_v2");
}

#[test]
fn has_tag_variant_looks_at_tag_rules_only() {
    let variants = vec![
        variant("beta", GrayRule::Beta(BetaRule::new(["v9"])), 10),
        variant("tag_v2", GrayRule::Tag(TagRule::new("v2")), 9),
    ];

    assert!(has_tag_variant(&variants, "v2"));
    assert!(!has_tag_variant(&variants, "v9"));
}
