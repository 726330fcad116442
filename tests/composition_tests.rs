//! Composition Tests
//!
//! End-to-end checks across the registry, dataset factory and normalizer.

use std::sync::Arc;

use familiar_resources::normalize::{DiagnosticCode, Diagnostics, MetadataField};
use familiar_resources::store::SubscriptionBus;
use familiar_resources::{
    create_dataset, normalize, normalize_with_diagnostics, DatasetDefinition, EnvelopeData,
    Resolvable, ResolvableKind, ResolvableRef, ResolvedDefinition, ResourceDescriptor,
    ResourceError, StoreDefinition, StoreRegistry,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

fn fixture(name: &str) -> Value {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[derive(Default)]
struct RecordingBus {
    events: Mutex<Vec<String>>,
}

impl SubscriptionBus for RecordingBus {
    fn trigger(&self, event: &str) {
        self.events.lock().push(event.to_string());
    }
}

// =============================================================================
// Normalization
// =============================================================================

#[test]
fn test_normalize_collection_fixture() {
    let payload = fixture("users_payload.json");
    let mut diagnostics = Diagnostics::new();
    let envelope = normalize_with_diagnostics(&payload, None, &mut diagnostics).unwrap();

    assert_eq!(envelope.type_name.as_deref(), Some("user"));
    assert_eq!(envelope.partial.as_deref(), Some("card"));

    let entries = envelope.data.as_collection().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(Value::Object(entries[0].clone()), json!({ "id": 1, "name": "Ada" }));
    assert_eq!(Value::Object(entries[1].clone()), json!({ "id": 2, "name": "Grace" }));

    let codes: Vec<_> = diagnostics.all().iter().map(|d| (d.code, d.path.as_str())).collect();
    assert_eq!(
        codes,
        vec![
            (DiagnosticCode::EmbeddedResource, "$[0].team"),
            (DiagnosticCode::UnknownEnvelopeKey, "$[1]"),
        ]
    );
}

#[test]
fn test_normalize_conflict_fixture() {
    let err = normalize(&fixture("conflicting_types.json"), None).unwrap_err();

    match err {
        ResourceError::ConflictingEnvelopeMetadata { field, first, second } => {
            assert_eq!(field, MetadataField::Type);
            assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
        }
        other => panic!("Expected ConflictingEnvelopeMetadata, got {:?}", other),
    }
}

#[test]
fn test_single_and_collection_shapes() {
    let single = normalize(&json!({ "id": 1 }), None).unwrap();
    let collection = normalize(&json!([{ "id": 1 }]), None).unwrap();

    assert!(matches!(single.data, EnvelopeData::Single(_)));
    assert!(matches!(collection.data, EnvelopeData::Collection(_)));
}

// =============================================================================
// Registry + Stores
// =============================================================================

#[test]
fn test_store_from_fixture_definition() {
    let registry = StoreRegistry::new();
    let store = registry.create_store(fixture("store_definition.json")).unwrap();

    assert_eq!(store.type_name(), "users");
    assert_eq!(store.definition().param_id.as_deref(), Some("id"));
    assert_eq!(store.definition().to_value().unwrap(), fixture("store_definition.json"));
}

#[test]
fn test_registries_are_isolated() {
    let first = StoreRegistry::new();
    let second = StoreRegistry::new();

    first.create_named_store("widgets", json!({})).unwrap();
    second.create_named_store("widgets", json!({})).unwrap();

    assert!(!first.get("widgets").unwrap().ptr_eq(&second.get("widgets").unwrap()));
}

#[test]
fn test_shadow_store_prefetch_flow() {
    let registry = StoreRegistry::new();

    // Data arrives before the store is declared
    let envelope = normalize(&json!({ "_type": "users", "id": "1", "name": "Ada" }), None).unwrap();
    let type_name = envelope.type_name.clone().unwrap();
    let shadow = registry.create_shadow_store(type_name.as_str()).unwrap();
    let descriptor = ResourceDescriptor::for_id("1");
    shadow.touch_resource(&descriptor, Value::Object(envelope.data.as_single().unwrap().clone()));

    let holder = registry.get("users").unwrap();
    let store = registry
        .create_named_store("users", StoreDefinition::new().with_uri("/users"))
        .unwrap();

    assert!(store.ptr_eq(&holder));
    assert_eq!(holder.definition().uri.as_deref(), Some("/users"));
    assert_eq!(store.fetch_resource(&descriptor), Some(json!({ "id": "1", "name": "Ada" })));

    match holder.resolvable().definition {
        ResolvedDefinition::Store(definition) => assert_eq!(definition.uri.as_deref(), Some("/users")),
        other => panic!("Expected store definition, got {:?}", other),
    }
}

#[test]
fn test_store_events_go_through_bus() {
    let bus = Arc::new(RecordingBus::default());
    let registry = StoreRegistry::new().with_bus(bus.clone());
    let store = registry.create_named_store("widgets", json!({})).unwrap();

    store.notify_change(&ResourceDescriptor::for_id("3"));
    assert_eq!(*bus.events.lock(), vec!["change", "change:3"]);
}

// =============================================================================
// Datasets
// =============================================================================

#[test]
fn test_dataset_of_two_definitions() {
    let dataset = create_dataset([
        fixture("dataset_definition.json").into(),
        DatasetDefinition::new().with_partial("full").into(),
    ])
    .unwrap();

    let descriptor = dataset.resolvable();
    assert_eq!(descriptor.kind, ResolvableKind::Dataset);

    let ResolvedDefinition::Composite(children) = descriptor.definition else {
        panic!("Expected composite definition");
    };
    assert_eq!(children.len(), 2);
    for child in &children {
        assert_eq!(child.resolvable().kind, ResolvableKind::Dataset);
    }
    assert_eq!(children[0].as_dataset().unwrap().partial(), Some("card"));
    assert_eq!(children[1].as_dataset().unwrap().partial(), Some("full"));
}

#[test]
fn test_store_dataset_parent_chain() {
    let registry = StoreRegistry::new();
    let store = registry.create_named_store("users", json!({ "uri": "/users" })).unwrap();

    let cards = store
        .create_dataset([json!({ "partial": "card" }).into()])
        .unwrap();
    let featured = cards
        .create_dataset([json!({ "uri": "/featured" }).into()])
        .unwrap();

    let chain = featured.ancestors();
    assert_eq!(chain.len(), 2);
    assert!(chain[0].ptr_eq(&ResolvableRef::Dataset(cards.clone())));
    assert!(chain[1].ptr_eq(&ResolvableRef::Store(store.clone())));
    assert_eq!(chain[1].kind(), ResolvableKind::Store);
}

#[test]
fn test_mixed_composite_keeps_store() {
    let registry = StoreRegistry::new();
    let store = registry.create_named_store("users", json!({})).unwrap();

    let dataset = create_dataset([store.clone().into(), json!({ "partial": "card" }).into()]).unwrap();

    assert!(dataset.children()[0].ptr_eq(&ResolvableRef::Store(store)));
    assert_eq!(dataset.children()[1].kind(), ResolvableKind::Dataset);
}
