use super::*;
use crate::constants::DEFAULT_NAMESPACE;
use crate::Error;

#[test]
fn blank_namespace_is_replaced_by_default() {
    let key = ConfigKey::new("  ", "DEFAULT_GROUP", "app.properties").unwrap();

    assert_eq!(key.namespace(), DEFAULT_NAMESPACE);
    assert_eq!(key.group_key(), "public>>DEFAULT_GROUP>>app.properties");
}

#[test]
fn separator_inside_segment_is_rejected() {
    let result = ConfigKey::new("public", "a>>b", "app.properties");

    assert!(matches!(result, Err(Error::InvalidKey(_))));
}

#[test]
fn blank_group_or_resource_is_rejected() {
    assert!(ConfigKey::new("public", "", "app.properties").is_err());
    assert!(ConfigKey::new("public", "DEFAULT_GROUP", " ").is_err());
}

#[test]
fn parse_round_trips_canonical_form() {
    let key = ConfigKey::new("dev", "g1", "db.yaml").unwrap();
    let parsed = ConfigKey::parse(key.group_key()).unwrap();

    assert_eq!(parsed, key);
    assert!(ConfigKey::parse("only>>two").is_err());
}

#[test]
fn explicit_tag_wins_over_auto_tag() {
    let labels = ClientLabels::for_request("10.0.0.1", Some("v2"), Some("auto"));
    assert_eq!(labels.tag(), Some("v2"));
    assert_eq!(labels.client_ip(), Some("10.0.0.1"));

    let labels = ClientLabels::for_request("10.0.0.1", Some(" "), Some("auto"));
    assert_eq!(labels.tag(), Some("auto"));

    let labels = ClientLabels::for_request("10.0.0.1", None, None);
    assert_eq!(labels.tag(), None);
}
