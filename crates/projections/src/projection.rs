//! Core projection trait and checkpoint tracking.

use std::collections::HashMap;

use async_trait::async_trait;
use common::AggregateId;
use event_store::{EventEnvelope, Version};

use crate::Result;

/// How far a projection has read each stream.
///
/// An event at or below the recorded version of its stream has already been
/// applied and is skipped, so replaying the store or delivering an event
/// twice leaves the read model unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    streams: HashMap<AggregateId, Version>,
    events_processed: u64,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `event` is newer than anything seen on its stream.
    pub fn accepts(&self, event: &EventEnvelope) -> bool {
        self.streams
            .get(&event.aggregate_id)
            .is_none_or(|seen| event.version > *seen)
    }

    /// Records `event` as applied.
    pub fn advance(&mut self, event: &EventEnvelope) {
        self.streams.insert(event.aggregate_id, event.version);
        self.events_processed += 1;
    }

    pub fn stream_version(&self, aggregate_id: AggregateId) -> Option<Version> {
        self.streams.get(&aggregate_id).copied()
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "checkpoint({} events, {} streams)",
            self.events_processed,
            self.streams.len()
        )
    }
}

/// A projection that folds store events into a read model.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Applies one event. Returns `false` when the event was already applied
    /// or is of no interest to this projection.
    async fn handle(&self, event: &EventEnvelope) -> Result<bool>;

    async fn checkpoint(&self) -> Checkpoint;

    /// Drops all state so the projection can be rebuilt from scratch.
    async fn reset(&self) -> Result<()>;
}
