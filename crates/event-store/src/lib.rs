//! Append-only event storage.
//!
//! Streams are addressed by [`AggregateId`] and versioned per stream. The
//! [`EventStore::commit`] operation writes several streams atomically, each
//! guarded by its own expected version.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{CORRELATION_KEY, EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream, StreamAppend};
