//! Familiar Resources
//!
//! Declarative descriptions of remote-backed object collections (stores) and
//! composed views over them (datasets), plus the normalizer that turns raw
//! server payloads into cache-ready `{type, partial, data}` envelopes.
//!
//! ## Features
//!
//! - **Definition Validation**: closed key sets per entity kind, typed values
//! - **Store Registry**: one store per type name, shadow-store override, anonymous stores
//! - **Dataset Composition**: datasets of datasets, parent chains for inheritance
//! - **Payload Normalization**: metadata/data split with cross-entry conflict checks
//!
//! ## Flow
//!
//! ```text
//! definitions ──► validate ──► StoreRegistry / create_dataset ──► Resolvable graph
//!                                                                   │ (resolution engine)
//! payload ──► normalize ──► ResourceEnvelope ──► Store::touch/update/delete_resource
//! ```

pub mod config;
pub mod dataset;
pub mod definition;
pub mod error;
pub mod normalize;
pub mod registry;
pub mod resolvable;
pub mod store;

pub use config::{NormalizerConfig, RegistryConfig, ResourcesConfig};
pub use dataset::{create_dataset, Dataset, DatasetArg};
pub use definition::{validate_definition, DatasetDefinition, DefinitionKind, StoreDefinition};
pub use error::{ResourceError, Result};
pub use normalize::{normalize, normalize_with_diagnostics, EnvelopeData, ResourceEnvelope};
pub use registry::{StoreRegistry, StoreSource};
pub use resolvable::{ParentRef, Resolvable, ResolvableDescriptor, ResolvableKind, ResolvableRef, ResolvedDefinition};
pub use store::{FragmentCache, MemoryFragmentCache, ResourceDescriptor, Store, SubscriptionBus};
