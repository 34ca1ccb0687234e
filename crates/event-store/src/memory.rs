use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Snapshot, Version,
    store::{EventStore, EventStream, StreamAppend, record_commit, validate_commit},
};

#[derive(Default)]
struct MemoryState {
    /// Every event in commit order.
    log: Vec<EventEnvelope>,
    /// Current version of each stream.
    heads: HashMap<AggregateId, Version>,
    snapshots: HashMap<AggregateId, Snapshot>,
}

/// Event store kept entirely in process memory.
///
/// A single lock guards the log and the stream heads, so a commit's version
/// checks and its writes happen as one step. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.log.len()
    }

    /// Drops every event and snapshot.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.log.clear();
        state.heads.clear();
        state.snapshots.clear();
    }
}

fn check_head(append: &StreamAppend, head: Version) -> Result<()> {
    let first = &append.events[0];
    if let Some(expected) = append.options.expected_version
        && expected != head
    {
        return Err(EventStoreError::ConcurrencyConflict {
            aggregate_id: first.aggregate_id,
            expected,
            actual: head,
        });
    }
    // Mirrors the unique (aggregate_id, version) constraint of the SQL store.
    if first.version != head.next() {
        return Err(EventStoreError::ConcurrencyConflict {
            aggregate_id: first.aggregate_id,
            expected: append.options.expected_version.unwrap_or(head),
            actual: head,
        });
    }
    Ok(())
}

impl InMemoryEventStore {
    async fn apply(&self, batch: Vec<StreamAppend>) -> Result<Vec<Version>> {
        validate_commit(&batch)?;

        let mut state = self.state.write().await;

        for append in &batch {
            let id = append.events[0].aggregate_id;
            let head = state.heads.get(&id).copied().unwrap_or_default();
            check_head(append, head)?;
        }

        let mut versions = Vec::with_capacity(batch.len());
        for append in batch {
            let id = append.events[0].aggregate_id;
            let last = append.last_version();
            state.heads.insert(id, last);
            state.log.extend(append.events);
            versions.push(last);
        }

        Ok(versions)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip_all, fields(streams = batch.len()))]
    async fn commit(&self, batch: Vec<StreamAppend>) -> Result<Vec<Version>> {
        let events = batch.iter().map(|a| a.events.len()).sum();
        let result = self.apply(batch).await;
        record_commit(events, &result);
        result
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        self.get_events_for_aggregate_from_version(aggregate_id, Version::first())
            .await
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let state = self.state.read().await;
        Ok(state
            .log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version >= from_version)
            .cloned()
            .collect())
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        let events = self.state.read().await.log.clone();
        Ok(Box::pin(futures_util::stream::iter(
            events.into_iter().map(Ok),
        )))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.state.read().await.heads.get(&aggregate_id).copied())
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.state
            .write()
            .await
            .snapshots
            .insert(snapshot.aggregate_id, snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        Ok(self
            .state
            .read()
            .await
            .snapshots
            .get(&aggregate_id)
            .cloned())
    }
}
