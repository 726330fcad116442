//! Stores
//!
//! A store is the gateway to one collection of same-typed remote objects.
//! The objects themselves live in a [`FragmentCache`]; change events go out
//! through a [`SubscriptionBus`]. Both are collaborators this crate only
//! talks to, so they sit behind traits.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::dataset::{self, Dataset, DatasetArg};
use crate::definition::StoreDefinition;
use crate::error::Result;
use crate::resolvable::{ParentRef, Resolvable, ResolvableDescriptor, ResolvableKind, ResolvableRef, ResolvedDefinition};

/// Generic event raised on every change
pub const CHANGE_EVENT: &str = "change";

/// Key of a single resource inside a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event raised for this resource; defaults to `change:<id>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl ResourceDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_partial(mut self, partial: impl Into<String>) -> Self {
        self.partial = Some(partial.into());
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Identifier-scoped event name, only for descriptors with an id
    pub fn event_name(&self) -> Option<String> {
        let id = self.id.as_ref()?;
        Some(
            self.event
                .clone()
                .unwrap_or_else(|| format!("{}:{}", CHANGE_EVENT, id)),
        )
    }
}

/// Fragment cache backing a store
pub trait FragmentCache: Send + Sync {
    /// Cached value, or `None` on a miss
    fn fetch(&self, descriptor: &ResourceDescriptor) -> Option<Value>;
    fn touch(&mut self, descriptor: &ResourceDescriptor, data: Value);
    fn update(&mut self, descriptor: &ResourceDescriptor, data: Value, status: u16);
    fn delete(&mut self, descriptor: &ResourceDescriptor);
}

/// Factory producing a fresh cache for new or reset stores
pub type CacheFactory = Arc<dyn Fn() -> Box<dyn FragmentCache> + Send + Sync>;

/// Change-notification collaborator
pub trait SubscriptionBus: Send + Sync {
    fn trigger(&self, event: &str);
}

/// Bus that only logs triggered events
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBus;

impl SubscriptionBus for LoggingBus {
    fn trigger(&self, event: &str) {
        debug!(event, "store change");
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CachedEntry {
    data: Value,
    status: Option<u16>,
}

/// In-process cache keyed by resource id and partial
#[derive(Debug, Default)]
pub struct MemoryFragmentCache {
    entries: HashMap<(Option<String>, Option<String>), CachedEntry>,
}

impl MemoryFragmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory for [`crate::StoreRegistry::with_cache_factory`]
    pub fn factory() -> CacheFactory {
        Arc::new(|| Box::new(MemoryFragmentCache::new()) as Box<dyn FragmentCache>)
    }

    /// Status recorded by the last `update` of this resource
    pub fn status(&self, descriptor: &ResourceDescriptor) -> Option<u16> {
        self.entries.get(&Self::key(descriptor)).and_then(|e| e.status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(descriptor: &ResourceDescriptor) -> (Option<String>, Option<String>) {
        (descriptor.id.clone(), descriptor.partial.clone())
    }
}

impl FragmentCache for MemoryFragmentCache {
    fn fetch(&self, descriptor: &ResourceDescriptor) -> Option<Value> {
        self.entries.get(&Self::key(descriptor)).map(|e| e.data.clone())
    }

    /// Merge object fields into the cached entry, or insert it
    fn touch(&mut self, descriptor: &ResourceDescriptor, data: Value) {
        let entry = self
            .entries
            .entry(Self::key(descriptor))
            .or_insert_with(|| CachedEntry { data: Value::Null, status: None });

        match (&mut entry.data, data) {
            (Value::Object(existing), Value::Object(incoming)) => existing.extend(incoming),
            (slot, incoming) => *slot = incoming,
        }
    }

    fn update(&mut self, descriptor: &ResourceDescriptor, data: Value, status: u16) {
        self.entries.insert(
            Self::key(descriptor),
            CachedEntry { data, status: Some(status) },
        );
    }

    fn delete(&mut self, descriptor: &ResourceDescriptor) {
        self.entries.remove(&Self::key(descriptor));
    }
}

pub(crate) struct StoreInner {
    type_name: String,
    anonymous: bool,
    definition: RwLock<StoreDefinition>,
    cache: RwLock<Box<dyn FragmentCache>>,
    cache_factory: CacheFactory,
    bus: Arc<dyn SubscriptionBus>,
}

/// Handle to a registered store
///
/// Clones share the same store; holders keep seeing definition changes.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

/// Non-owning store handle
#[derive(Debug, Clone)]
pub struct WeakStore(Weak<StoreInner>);

impl WeakStore {
    pub fn upgrade(&self) -> Option<Store> {
        self.0.upgrade().map(|inner| Store { inner })
    }
}

impl Store {
    pub(crate) fn new(
        type_name: String,
        anonymous: bool,
        definition: StoreDefinition,
        cache_factory: CacheFactory,
        bus: Arc<dyn SubscriptionBus>,
    ) -> Self {
        let cache = RwLock::new(cache_factory());
        Self {
            inner: Arc::new(StoreInner {
                type_name,
                anonymous,
                definition: RwLock::new(definition),
                cache,
                cache_factory,
                bus,
            }),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    /// Snapshot of the current definition
    pub fn definition(&self) -> StoreDefinition {
        self.inner.definition.read().clone()
    }

    pub fn is_shadow(&self) -> bool {
        self.inner.definition.read().is_shadow()
    }

    /// Whether the type name was generated rather than given
    pub fn is_anonymous(&self) -> bool {
        self.inner.anonymous
    }

    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakStore {
        WeakStore(Arc::downgrade(&self.inner))
    }

    pub(crate) fn replace_definition(&self, definition: StoreDefinition) {
        *self.inner.definition.write() = definition;
    }

    /// Drop every cached fragment
    pub fn reset(&self) {
        *self.inner.cache.write() = (self.inner.cache_factory)();
        debug!(store = %self.inner.type_name, "fragment cache reset");
    }

    /// Create a dataset whose parent is this store
    pub fn create_dataset<I>(&self, args: I) -> Result<Dataset>
    where
        I: IntoIterator<Item = DatasetArg>,
    {
        dataset::create_dataset_with_parent(args, Some(ParentRef::Store(self.downgrade())))
    }

    pub fn notify_change(&self, descriptor: &ResourceDescriptor) {
        self.inner.bus.trigger(CHANGE_EVENT);
        if let Some(event) = descriptor.event_name() {
            self.inner.bus.trigger(&event);
        }
    }

    pub fn fetch_resource(&self, descriptor: &ResourceDescriptor) -> Option<Value> {
        self.inner.cache.read().fetch(descriptor)
    }

    pub fn touch_resource(&self, descriptor: &ResourceDescriptor, data: Value) {
        self.inner.cache.write().touch(descriptor, data);
    }

    pub fn update_resource(&self, descriptor: &ResourceDescriptor, data: Value, status: u16) {
        self.inner.cache.write().update(descriptor, data, status);
    }

    pub fn delete_resource(&self, descriptor: &ResourceDescriptor) {
        self.inner.cache.write().delete(descriptor);
    }
}

impl Resolvable for Store {
    fn resolvable(&self) -> ResolvableDescriptor {
        ResolvableDescriptor {
            kind: ResolvableKind::Store,
            definition: ResolvedDefinition::Store(self.definition()),
            reference: ResolvableRef::Store(self.clone()),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("type_name", &self.inner.type_name)
            .field("anonymous", &self.inner.anonymous)
            .field("definition", &*self.inner.definition.read())
            .finish()
    }
}
