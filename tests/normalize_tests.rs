//! Normalizer properties over arbitrary parse trees.

mod common;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_yaml::{Mapping, Value as Raw};
use stepwise::normalize::Normalizer;
use stepwise::value::Value;

fn scalar() -> impl Strategy<Value = Raw> {
    prop_oneof![
        Just(Raw::Null),
        any::<bool>().prop_map(Raw::Bool),
        any::<i64>().prop_map(|n| Raw::Number(n.into())),
        "[a-z0-9 #.]{0,8}".prop_map(Raw::String),
    ]
}

/// Trees whose mapping keys are any scalar, not just strings.
fn tree() -> impl Strategy<Value = Raw> {
    scalar().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Raw::Sequence),
            prop::collection::vec((scalar(), inner), 0..4).prop_map(|pairs| {
                let mut mapping = Mapping::new();
                for (k, v) in pairs {
                    mapping.insert(k, v);
                }
                Raw::Mapping(mapping)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in tree()) {
        let n = Normalizer::new();
        let once = n.normalize(&raw);
        prop_assert_eq!(n.renormalize(&once), once);
    }

    #[test]
    fn normalize_is_idempotent_when_preserving_null(raw in tree()) {
        let n = Normalizer::preserving_null();
        let once = n.normalize(&raw);
        prop_assert_eq!(n.renormalize(&once), once);
    }

    #[test]
    fn field_access_never_fails(raw in tree(), path in "[a-z0-9.]{0,12}") {
        let n = Normalizer::new();
        let _ = n.extract_field(&raw, &path);
        let set = n.set_field(&raw, "test", Value::from("T"));
        prop_assert_eq!(set.get("test"), Some(&Value::from("T")));
    }

    #[test]
    fn normalized_trees_serialize_as_json(raw in tree()) {
        let once = Normalizer::new().normalize(&raw);
        prop_assert!(serde_json::to_string(&once).is_ok());
    }
}

#[test]
fn integer_and_string_keys_compare_equal() {
    let n = Normalizer::new();
    let numeric = common::raw("{1: a, true: b}");
    let textual = common::raw("{'1': a, 'true': b}");
    assert!(n.deep_equal(&numeric, &textual));
    assert_eq!(n.normalize(&numeric), n.normalize(&textual));
}

#[test]
fn colliding_keys_keep_first_position_and_last_value() {
    let value = Normalizer::new().normalize(&common::raw("{1: a, x: b, '1': c}"));
    let map = value.as_map().unwrap();
    let keys: Vec<_> = map.keys().cloned().collect();
    assert_eq!(keys, vec!["1", "x"]);
    assert_eq!(map.get("1"), Some(&Value::from("c")));
}

#[test]
fn definition_from_fixture() {
    let def = common::definition(&common::fixture("login.yaml"));
    assert_eq!(def.name, "Login");
    assert_eq!(def.nav.as_deref(), Some("/login"));
    assert_eq!(def.setup.len(), 1);
    assert_eq!(def.main.len(), 4);
    assert_eq!(def.teardown.len(), 1);
    assert_eq!(def.bindings.get("email"), Some(&Value::from("ann@example.com")));
}
