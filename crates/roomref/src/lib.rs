// lib.rs — Room-resource reference index core.
//
// Clients of a real-time collaborative document system join rooms whose
// visible state can depend, through link/lookup/formula fields, on other
// documents. This crate maintains the bidirectional room-resource
// association over a shared TTL-bounded set store and reverse-computes the
// transitive dependency closure of a room from document schemas when the
// index has no answer. Storage engines, the cache client, the forward
// field-reference indexer and the delivery transport are injected behind
// async traits.

pub mod closure;
pub mod config;
pub mod formula;
pub mod rel_index;
pub mod resource;
pub mod revision;
pub mod router;
pub mod schema;
pub mod set_store;


pub use closure::{DependencyClosureResolver, ReverseReferenceIndex, SchemaProvider};
pub use config::{RoomrefConfig, REF_STORAGE_EXPIRE};
pub use rel_index::RoomResourceIndex;
pub use resource::{is_datasheet, ResourceRevision, ResourceType};
pub use revision::{RevisionAggregator, RevisionStore};
pub use router::{ChangeRouter, RemoteChangeset, RoomChangeResult};
pub use schema::{DocumentSchema, Field, FieldProperty, FieldType};
pub use set_store::{AssociativeSetStore, MemorySetStore};
