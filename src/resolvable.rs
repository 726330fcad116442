//! Resolvable capability
//!
//! Stores and datasets both take part in the composition graph. The
//! resolution engine walks that graph through [`Resolvable::resolvable`],
//! which hands out a fresh `{kind, definition, reference}` descriptor on
//! every call; descriptors are never cached, so a replaced shadow store
//! definition is visible the next time it is asked for.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dataset::{Dataset, WeakDataset};
use crate::definition::{DatasetDefinition, StoreDefinition};
use crate::store::{Store, WeakStore};

/// Kind tag of a resolvable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvableKind {
    Store,
    Dataset,
}

impl fmt::Display for ResolvableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvableKind::Store => write!(f, "store"),
            ResolvableKind::Dataset => write!(f, "dataset"),
        }
    }
}

/// A prebuilt resolvable: a store or a dataset
#[derive(Debug, Clone)]
pub enum ResolvableRef {
    Store(Store),
    Dataset(Dataset),
}

impl ResolvableRef {
    pub fn kind(&self) -> ResolvableKind {
        match self {
            ResolvableRef::Store(_) => ResolvableKind::Store,
            ResolvableRef::Dataset(_) => ResolvableKind::Dataset,
        }
    }

    /// Identity comparison; two refs are equal when they point at the same instance
    pub fn ptr_eq(&self, other: &ResolvableRef) -> bool {
        match (self, other) {
            (ResolvableRef::Store(a), ResolvableRef::Store(b)) => a.ptr_eq(b),
            (ResolvableRef::Dataset(a), ResolvableRef::Dataset(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn as_store(&self) -> Option<&Store> {
        match self {
            ResolvableRef::Store(store) => Some(store),
            ResolvableRef::Dataset(_) => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            ResolvableRef::Dataset(dataset) => Some(dataset),
            ResolvableRef::Store(_) => None,
        }
    }

    /// Non-owning handle to the same instance
    pub fn downgrade(&self) -> ParentRef {
        match self {
            ResolvableRef::Store(store) => ParentRef::Store(store.downgrade()),
            ResolvableRef::Dataset(dataset) => ParentRef::Dataset(dataset.downgrade()),
        }
    }
}

impl From<Store> for ResolvableRef {
    fn from(store: Store) -> Self {
        ResolvableRef::Store(store)
    }
}

impl From<Dataset> for ResolvableRef {
    fn from(dataset: Dataset) -> Self {
        ResolvableRef::Dataset(dataset)
    }
}

/// Definition snapshot carried by a descriptor
#[derive(Debug, Clone)]
pub enum ResolvedDefinition {
    Store(StoreDefinition),
    Dataset(DatasetDefinition),
    /// Ordered children of a composite dataset
    Composite(Vec<ResolvableRef>),
}

/// Canonical descriptor consumed by the resolution engine
#[derive(Debug, Clone)]
pub struct ResolvableDescriptor {
    pub kind: ResolvableKind,
    pub definition: ResolvedDefinition,
    pub reference: ResolvableRef,
}

/// Capability of producing a [`ResolvableDescriptor`]
pub trait Resolvable {
    fn resolvable(&self) -> ResolvableDescriptor;
}

impl Resolvable for ResolvableRef {
    fn resolvable(&self) -> ResolvableDescriptor {
        match self {
            ResolvableRef::Store(store) => store.resolvable(),
            ResolvableRef::Dataset(dataset) => dataset.resolvable(),
        }
    }
}

/// Non-owning back edge from a dataset to the store or dataset that created it
#[derive(Debug, Clone)]
pub enum ParentRef {
    Store(WeakStore),
    Dataset(WeakDataset),
}

impl ParentRef {
    pub fn kind(&self) -> ResolvableKind {
        match self {
            ParentRef::Store(_) => ResolvableKind::Store,
            ParentRef::Dataset(_) => ResolvableKind::Dataset,
        }
    }

    /// The parent, if it is still alive
    pub fn upgrade(&self) -> Option<ResolvableRef> {
        match self {
            ParentRef::Store(store) => store.upgrade().map(ResolvableRef::Store),
            ParentRef::Dataset(dataset) => dataset.upgrade().map(ResolvableRef::Dataset),
        }
    }
}
