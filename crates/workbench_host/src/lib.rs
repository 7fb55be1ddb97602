//! Typed host-domain contracts for workbench session state.
//!
//! This crate is the API-first boundary between the workbench runtime and the backend store. It
//! exposes the two scope families (settings and shared storage), the scoped key-value store
//! service trait with in-memory and no-op adapters, versioned value envelopes, and the write
//! ordering helpers the adapters rely on. Concrete transports live behind the
//! [`ScopedValueStore`] trait.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod scope;
pub mod storage;
pub mod time;

pub use scope::{ScopePartition, SettingScope, StorageScope, StoreScope, WorkspaceId};
pub use storage::envelope::{
    build_value_envelope, load_envelope_with_migration, migrate_envelope_payload, ValueEnvelope,
    VALUE_ENVELOPE_VERSION,
};
pub use storage::scoped::{
    batch_get_with_defaults, get_value_or_not_found, load_value_with, save_value_with,
    MemoryScopedStore, NoopScopedStore, ScopedStoreFuture, ScopedValueStore,
};
pub use storage::StoreError;
pub use time::{next_monotonic_timestamp_ms, unix_time_ms_now, WriteSequence};
