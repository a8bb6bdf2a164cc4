//! Registration tests: listener and modifier handles, duplicates, path
//! normalization, and error classification.

mod common;

use common::{append_payload, init_tracing, replace_with_payload, Journal};
use rootstate::{Listener, Store, StoreConfig, StoreError};
use serde_json::json;

fn store() -> Store {
    init_tracing();
    Store::default()
}

fn recorder(journal: &Journal, tag: &'static str) -> Listener {
    let journal = journal.clone();
    Listener::new(move |_, _| {
        journal.push(tag);
        Ok(())
    })
}

// =========================================================================
// Listeners
// =========================================================================

#[test]
fn off_removes_only_that_listener() {
    let store = store();
    let journal = Journal::default();
    let a = store.subscribe("PING", recorder(&journal, "a"));
    store.subscribe("PING", recorder(&journal, "b"));

    assert!(store.off("PING", a));
    store.dispatch("PING", ()).unwrap();

    assert_eq!(journal.entries(), vec!["b"]);
    assert!(!store.off("PING", a));
}

#[test]
fn subscribing_the_same_listener_twice_is_a_no_op() {
    let store = store();
    let journal = Journal::default();
    let listener = recorder(&journal, "once");

    let first = store.subscribe("PING", listener.clone());
    let second = store.subscribe("PING", listener.clone());
    assert_eq!(first, second);

    store.dispatch("PING", ()).unwrap();
    assert_eq!(journal.len(), 1);
}

#[test]
fn shared_listener_can_serve_several_events() {
    let store = store();
    let journal = Journal::default();
    let listener = recorder(&journal, "seen");
    let ping = store.subscribe("PING", listener.clone());
    let pong = store.subscribe("PONG", listener);
    assert_ne!(ping, pong);

    store.dispatch("PING", ()).unwrap();
    store.dispatch("PONG", ()).unwrap();
    assert_eq!(journal.len(), 2);

    // A handle only removes the registration it was issued for.
    assert!(!store.off("PONG", ping));
    assert!(store.off("PONG", pong));
    store.dispatch("PONG", ()).unwrap();
    assert_eq!(journal.len(), 2);
}

#[test]
fn off_all_clears_listeners_but_keeps_modifiers() {
    let store = store();
    let journal = Journal::default();
    store.subscribe("ADD", recorder(&journal, "a"));
    store.subscribe("ADD", recorder(&journal, "b"));
    store
        .add_state_modifier("items", "ADD", append_payload)
        .unwrap();

    assert_eq!(store.off_all("ADD"), 2);
    assert_eq!(store.off_all("ADD"), 0);
    store.dispatch("ADD", 1).unwrap();

    assert!(journal.entries().is_empty());
    assert_eq!(store.get_state(), json!({"items": [1]}));
}

#[test]
fn listener_may_unsubscribe_itself_mid_dispatch() {
    let store = store();
    let journal = Journal::default();
    let id = std::rc::Rc::new(std::cell::Cell::new(None));
    let (s, j, slot) = (store.clone(), journal.clone(), id.clone());
    let registered = store.on("PING", move |_, _| {
        j.push("fired");
        if let Some(me) = slot.get() {
            s.off("PING", me);
        }
        Ok(())
    });
    id.set(Some(registered));

    store.dispatch("PING", ()).unwrap();
    store.dispatch("PING", ()).unwrap();
    assert_eq!(journal.len(), 1);
}

// =========================================================================
// State modifiers
// =========================================================================

#[test]
fn duplicate_event_and_path_is_rejected() {
    let store = store();
    store
        .add_state_modifier("data.users", "USER_CREATED", append_payload)
        .unwrap();

    let err = store
        .add_state_modifier("data.users", "USER_CREATED", append_payload)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateModifier { ref event, ref path }
            if event == "USER_CREATED" && path == "data.users"
    ));
    assert!(err.is_configuration());
}

#[test]
fn paths_are_normalized_before_duplicate_check() {
    let store = store();
    store
        .add_state_modifier("a..b.", "SET", replace_with_payload)
        .unwrap();

    let err = store
        .add_state_modifier(".a.b", "SET", replace_with_payload)
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateModifier { ref path, .. } if path == "a.b"));

    store.dispatch("SET", "x").unwrap();
    assert_eq!(store.get_state(), json!({"a": {"b": "x"}}));
}

#[test]
fn same_path_under_different_events_is_allowed() {
    let store = store();
    store
        .add_state_modifier("counter", "SET", replace_with_payload)
        .unwrap();
    store
        .add_state_modifier("counter", "RESET", |_, _, _| 0.into())
        .unwrap();

    store.dispatch("SET", 5).unwrap();
    assert_eq!(store.get_state_at("counter").unwrap(), json!(5));
    store.dispatch("RESET", ()).unwrap();
    assert_eq!(store.get_state_at("counter").unwrap(), json!(0));
}

#[test]
fn overlapping_modifier_paths_are_allowed() {
    let store = store();
    store
        .add_state_modifier("data", "E", replace_with_payload)
        .unwrap();
    store
        .add_state_modifier("data.users", "E", append_payload)
        .unwrap();
    store
        .add_state_modifier("data.users", "F", append_payload)
        .unwrap();
}

#[test]
fn remove_state_modifier_removes_exactly_one() {
    let store = store();
    let first = store
        .add_state_modifier("a", "SET", replace_with_payload)
        .unwrap();
    store
        .add_state_modifier("b", "SET", replace_with_payload)
        .unwrap();

    assert!(store.remove_state_modifier(first));
    assert!(!store.remove_state_modifier(first));
    store.dispatch("SET", 1).unwrap();
    assert_eq!(store.get_state(), json!({"b": 1}));

    // The pair is free again.
    store
        .add_state_modifier("a", "SET", replace_with_payload)
        .unwrap();
}

#[test]
fn remove_state_modifiers_clears_one_event() {
    let store = store();
    store
        .add_state_modifier("a", "SET", replace_with_payload)
        .unwrap();
    store
        .add_state_modifier("b", "SET", replace_with_payload)
        .unwrap();
    store
        .add_state_modifier("c", "OTHER", replace_with_payload)
        .unwrap();

    assert_eq!(store.remove_state_modifiers("SET"), 2);
    assert_eq!(store.remove_state_modifiers("SET"), 0);
    store.dispatch("SET", 1).unwrap();
    store.dispatch("OTHER", 2).unwrap();
    assert_eq!(store.get_state(), json!({"c": 2}));
}

#[test]
fn configured_default_path_is_normalized_too() {
    let store = Store::new(StoreConfig::builder().path("data..users").build());
    store
        .add_state_modifier(None, "USER_CREATED", append_payload)
        .unwrap();

    let err = store
        .add_state_modifier("data.users", "USER_CREATED", append_payload)
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateModifier { .. }));
}

// =========================================================================
// Error classification
// =========================================================================

#[test]
fn path_errors_are_configuration_errors() {
    let store = store();

    let missing = store
        .add_state_modifier(None, "E", replace_with_payload)
        .unwrap_err();
    assert!(missing.is_configuration());
    assert_eq!(
        missing.to_string(),
        "cannot add a state modifier for E without a path"
    );

    let invalid = store
        .add_state_modifier("...", "E", replace_with_payload)
        .unwrap_err();
    assert!(matches!(invalid, StoreError::InvalidPath { .. }));
    assert!(invalid.is_configuration());
    assert!(!invalid.is_conflict());
}

#[test]
fn reserved_event_is_a_protocol_violation() {
    let store = store();
    let err = store.dispatch(Store::META_DISPATCH, ()).unwrap_err();
    assert!(err.is_protocol_violation());
    assert!(!err.is_configuration());
}

#[test]
fn meta_event_can_still_be_observed_and_modified() {
    let store = store();
    store
        .add_state_modifier("dispatches", Store::META_DISPATCH, |old, meta, _| {
            old.appended(meta.get("eventName").cloned().unwrap_or_default())
        })
        .unwrap();

    store.dispatch("A", ()).unwrap();
    store.dispatch("B", ()).unwrap();
    assert_eq!(store.get_state(), json!({"dispatches": ["A", "B"]}));
}
