//! Serialization hooks: backing state is exposed to serde, and deserialized
//! containers re-establish nested forwarding before first use.

#![cfg(feature = "serde")]

use std::cell::Cell;
use std::rc::Rc;

use reactive_bindings::{Observable, ObservableDictionary, ObservableHashSet, Property};

#[test]
fn dictionary_serializes_as_map() {
    let dict: ObservableDictionary<String, u32> = ObservableDictionary::new();
    dict.set("a".into(), 1);
    let json = serde_json::to_string(&dict).expect("serialize");
    assert_eq!(json, r#"{"a":1}"#);
}

#[test]
fn set_serializes_as_sequence() {
    let set: ObservableHashSet<u8> = [3u8].into_iter().collect();
    let json = serde_json::to_string(&set).expect("serialize");
    assert_eq!(json, "[3]");

    let back: ObservableHashSet<u8> = serde_json::from_str("[1,2,2]").expect("deserialize");
    assert!(back.set_equals([1, 2]));
}

#[test]
fn deserialized_dictionary_rewires_nested_properties() {
    let json = r#"{"width":3,"height":4}"#;
    let dict: ObservableDictionary<String, Property<u32>> =
        serde_json::from_str(json).expect("deserialize");
    assert_eq!(dict.len(), 2);

    let hits = Rc::new(Cell::new(0u32));
    let h = Rc::clone(&hits);
    dict.on_updated(move || h.set(h.get() + 1));

    let width = dict.get(&"width".to_string()).expect("width present");
    assert_eq!(width.get(), 3);
    width.set(30);
    assert_eq!(hits.get(), 1);

    let again = serde_json::to_string(&dict.get(&"width".to_string())).expect("serialize");
    assert_eq!(again, "30");
}
