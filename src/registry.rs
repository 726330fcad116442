//! Store Registry
//!
//! Maps store type names to stores. Entries are added, never removed; the
//! only in-place change allowed is replacing a shadow store's definition.
//!
//! The registry is an explicit value: construct one at application start and
//! hand it to whoever creates stores. Every check-then-register sequence runs
//! under a single write lock.

use parking_lot::{Mutex, RwLock};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::definition::StoreDefinition;
use crate::error::{ResourceError, Result};
use crate::store::{CacheFactory, LoggingBus, MemoryFragmentCache, Store, SubscriptionBus};

/// Shortest generated name for anonymous stores
pub const MIN_ANONYMOUS_TYPE_LENGTH: usize = 8;

/// Generator for anonymous store type names
pub type TypeGenerator = Box<dyn FnMut() -> String + Send>;

/// Definition argument of [`StoreRegistry::create_store`]
#[derive(Debug, Clone)]
pub enum StoreSource {
    Definition(StoreDefinition),
    Raw(Value),
}

impl StoreSource {
    fn into_definition(self) -> Result<StoreDefinition> {
        match self {
            StoreSource::Definition(definition) => Ok(definition),
            StoreSource::Raw(value) => StoreDefinition::from_value(&value),
        }
    }
}

impl From<StoreDefinition> for StoreSource {
    fn from(definition: StoreDefinition) -> Self {
        StoreSource::Definition(definition)
    }
}

impl From<Value> for StoreSource {
    fn from(value: Value) -> Self {
        StoreSource::Raw(value)
    }
}

/// The store registry
pub struct StoreRegistry {
    stores: RwLock<HashMap<String, Store>>,
    cache_factory: CacheFactory,
    bus: Arc<dyn SubscriptionBus>,
    generate_type: Mutex<TypeGenerator>,
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreRegistry {
    /// Registry with in-memory caches and a logging bus
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    pub fn with_config(config: &RegistryConfig) -> Self {
        let length = config.anonymous_type_length.max(MIN_ANONYMOUS_TYPE_LENGTH);
        let generator: TypeGenerator = Box::new(move || random_type_name(length));

        Self {
            stores: RwLock::new(HashMap::new()),
            cache_factory: MemoryFragmentCache::factory(),
            bus: Arc::new(LoggingBus),
            generate_type: Mutex::new(generator),
        }
    }

    /// Use a different fragment cache for stores created from now on
    pub fn with_cache_factory(mut self, factory: CacheFactory) -> Self {
        self.cache_factory = factory;
        self
    }

    pub fn with_bus(mut self, bus: Arc<dyn SubscriptionBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_type_generator(mut self, generator: TypeGenerator) -> Self {
        self.generate_type = Mutex::new(generator);
        self
    }

    /// Create a store named by the definition's `type`, or an anonymous one
    pub fn create_store(&self, definition: impl Into<StoreSource>) -> Result<Store> {
        self.register(None, definition.into())
    }

    /// Create a store under `type_name`, overriding the definition's `type`
    pub fn create_named_store(
        &self,
        type_name: impl Into<String>,
        definition: impl Into<StoreSource>,
    ) -> Result<Store> {
        self.register(Some(type_name.into()), definition.into())
    }

    /// Placeholder store for data that arrives before its definition
    ///
    /// Returns the existing store when the type is already registered. An
    /// empty name is rejected: it could never be redefined later.
    pub fn create_shadow_store(&self, type_name: impl Into<String>) -> Result<Store> {
        let type_name = type_name.into();
        if type_name.is_empty() {
            return Err(ResourceError::EmptyStoreType);
        }

        let mut stores = self.stores.write();

        if let Some(existing) = stores.get(&type_name) {
            return Ok(existing.clone());
        }

        debug!(store = %type_name, "registering shadow store");
        let store = self.build(type_name.clone(), false, StoreDefinition::shadow(type_name.clone()));
        stores.insert(type_name, store.clone());
        Ok(store)
    }

    pub fn get(&self, type_name: &str) -> Option<Store> {
        self.stores.read().get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.stores.read().contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.read().is_empty()
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.stores.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn register(&self, explicit: Option<String>, source: StoreSource) -> Result<Store> {
        let mut definition = source.into_definition()?;

        // An explicit name wins over the definition's own `type`
        let type_name = explicit
            .filter(|name| !name.is_empty())
            .or_else(|| definition.type_name.clone())
            .filter(|name| !name.is_empty());

        let mut stores = self.stores.write();

        let Some(type_name) = type_name else {
            let type_name = {
                let mut generate = self.generate_type.lock();
                loop {
                    let candidate = (*generate)();
                    if !stores.contains_key(&candidate) {
                        break candidate;
                    }
                    debug!(candidate = %candidate, "anonymous store type collision, retrying");
                }
            };

            definition.type_name = Some(type_name.clone());
            debug!(store = %type_name, "registering anonymous store");
            let store = self.build(type_name.clone(), true, definition);
            stores.insert(type_name, store.clone());
            return Ok(store);
        };

        definition.type_name = Some(type_name.clone());

        if let Some(existing) = stores.get(&type_name) {
            if !existing.is_shadow() {
                return Err(ResourceError::StoreAlreadyDefined { type_name });
            }
            debug!(store = %type_name, "replacing shadow store definition");
            existing.replace_definition(definition);
            return Ok(existing.clone());
        }

        debug!(store = %type_name, "registering store");
        let store = self.build(type_name.clone(), false, definition);
        stores.insert(type_name, store.clone());
        Ok(store)
    }

    fn build(&self, type_name: String, anonymous: bool, definition: StoreDefinition) -> Store {
        Store::new(
            type_name,
            anonymous,
            definition,
            Arc::clone(&self.cache_factory),
            Arc::clone(&self.bus),
        )
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

fn random_type_name(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_named_store() {
        let registry = StoreRegistry::new();
        let store = registry.create_named_store("widgets", json!({ "uri": "/widgets" })).unwrap();

        assert_eq!(store.type_name(), "widgets");
        assert_eq!(store.definition().type_name.as_deref(), Some("widgets"));
        assert!(!store.is_anonymous());
        assert!(registry.get("widgets").unwrap().ptr_eq(&store));
    }

    #[test]
    fn test_type_from_definition() {
        let registry = StoreRegistry::new();
        let store = registry.create_store(json!({ "type": "gadgets" })).unwrap();
        assert_eq!(store.type_name(), "gadgets");
    }

    #[test]
    fn test_explicit_name_wins() {
        let registry = StoreRegistry::new();
        let store = registry
            .create_named_store("widgets", StoreDefinition::new().with_type("gadgets"))
            .unwrap();

        assert_eq!(store.type_name(), "widgets");
        assert_eq!(store.definition().type_name.as_deref(), Some("widgets"));
        assert!(!registry.contains("gadgets"));
    }

    #[test]
    fn test_empty_explicit_name_falls_back_to_definition_type() {
        let registry = StoreRegistry::new();
        let store = registry.create_named_store("", json!({ "type": "users" })).unwrap();

        assert_eq!(store.type_name(), "users");
        assert!(!store.is_anonymous());
        assert_eq!(registry.type_names(), vec!["users"]);
    }

    #[test]
    fn test_duplicate_store_fails() {
        let registry = StoreRegistry::new();
        registry.create_named_store("widgets", json!({})).unwrap();

        let err = registry.create_named_store("widgets", json!({})).unwrap_err();
        match err {
            ResourceError::StoreAlreadyDefined { type_name } => assert_eq!(type_name, "widgets"),
            other => panic!("Expected StoreAlreadyDefined, got {:?}", other),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_definition_registers_nothing() {
        let registry = StoreRegistry::new();
        let err = registry.create_named_store("widgets", json!({ "partial": "x" })).unwrap_err();

        assert!(err.is_definition_error());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_shadow_store_replaced_once() {
        let registry = StoreRegistry::new();
        let shadow = registry.create_shadow_store("widgets").unwrap();
        assert!(shadow.is_shadow());

        let store = registry.create_named_store("widgets", json!({ "uri": "/widgets" })).unwrap();
        assert!(store.ptr_eq(&shadow));
        assert!(!shadow.is_shadow());
        assert_eq!(shadow.definition().uri.as_deref(), Some("/widgets"));

        let err = registry.create_named_store("widgets", json!({})).unwrap_err();
        assert!(matches!(err, ResourceError::StoreAlreadyDefined { .. }));
    }

    #[test]
    fn test_shadow_store_rejects_empty_type() {
        let registry = StoreRegistry::new();

        assert!(matches!(
            registry.create_shadow_store(""),
            Err(ResourceError::EmptyStoreType)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_shadow_store_returns_existing() {
        let registry = StoreRegistry::new();
        let store = registry.create_named_store("widgets", json!({})).unwrap();
        let shadow = registry.create_shadow_store("widgets").unwrap();

        assert!(shadow.ptr_eq(&store));
        assert!(!shadow.is_shadow());
    }

    #[test]
    fn test_anonymous_stores_are_distinct() {
        let registry = StoreRegistry::new();
        let a = registry.create_store(json!({})).unwrap();
        let b = registry.create_store(StoreDefinition::new()).unwrap();

        assert_ne!(a.type_name(), b.type_name());
        assert!(a.is_anonymous() && b.is_anonymous());
        assert_eq!(a.type_name().len(), 12);
        assert_eq!(a.definition().type_name.as_deref(), Some(a.type_name()));
        assert!(registry.get(a.type_name()).unwrap().ptr_eq(&a));
        assert!(registry.get(b.type_name()).unwrap().ptr_eq(&b));
    }

    #[test]
    fn test_anonymous_generation_retries_on_collision() {
        let mut names = vec!["taken", "taken", "fresh"].into_iter();
        let registry = StoreRegistry::new()
            .with_type_generator(Box::new(move || names.next().unwrap_or("spare").to_string()));

        registry.create_named_store("taken", json!({})).unwrap();
        let store = registry.create_store(json!({})).unwrap();

        assert_eq!(store.type_name(), "fresh");
        assert_eq!(registry.type_names(), vec!["fresh", "taken"]);
    }

    #[test]
    fn test_empty_type_is_anonymous() {
        let registry = StoreRegistry::new();
        let store = registry.create_store(json!({ "type": "" })).unwrap();
        assert!(store.is_anonymous());
    }

    #[test]
    fn test_concurrent_named_creates_have_one_winner() {
        let registry = Arc::new(StoreRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.create_named_store("widgets", json!({})))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|err| matches!(
            err,
            ResourceError::StoreAlreadyDefined { type_name } if type_name == "widgets"
        )));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_anonymous_creates_get_distinct_names() {
        let registry = Arc::new(StoreRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.create_store(json!({})).unwrap().type_name().to_string())
            })
            .collect();
        let mut names: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        names.sort();
        names.dedup();

        assert_eq!(names.len(), 16);
        assert_eq!(registry.type_names(), names);
    }

    #[test]
    fn test_config_length_is_clamped() {
        let registry = StoreRegistry::with_config(&RegistryConfig { anonymous_type_length: 2 });
        let store = registry.create_store(json!({})).unwrap();
        assert_eq!(store.type_name().len(), MIN_ANONYMOUS_TYPE_LENGTH);
    }
}
