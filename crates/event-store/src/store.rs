use std::collections::HashSet;
use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Snapshot, Version};

/// Concurrency expectation for one stream in an append.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendOptions {
    /// Version the stream must be at for the write to succeed.
    /// `None` skips the check.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// No version check.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// The stream must not exist yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }
}

/// Events destined for a single stream, with that stream's expectation.
#[derive(Debug, Clone)]
pub struct StreamAppend {
    pub events: Vec<EventEnvelope>,
    pub options: AppendOptions,
}

impl StreamAppend {
    pub fn new(events: Vec<EventEnvelope>, options: AppendOptions) -> Self {
        Self { events, options }
    }

    /// Stream targeted by this append. Empty appends are rejected by
    /// [`validate_commit`] before this is consulted.
    pub fn aggregate_id(&self) -> Option<AggregateId> {
        self.events.first().map(|e| e.aggregate_id)
    }

    pub fn last_version(&self) -> Version {
        self.events
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial())
    }
}

/// A stream of events in commit order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Append-only storage of event streams.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Writes several streams in one atomic unit.
    ///
    /// Every stream's expected version is checked before anything is written;
    /// a single mismatch fails the whole commit with `ConcurrencyConflict` and
    /// nothing becomes visible. Returns the new version of each stream, in the
    /// order given.
    async fn commit(&self, batch: Vec<StreamAppend>) -> Result<Vec<Version>>;

    /// Appends events to one stream. Shorthand for a single-stream commit.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        let versions = self
            .commit(vec![StreamAppend::new(events, options)])
            .await?;
        versions
            .into_iter()
            .next()
            .ok_or_else(|| EventStoreError::InvalidAppend("commit returned no version".into()))
    }

    /// All events of a stream, oldest first.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Events of a stream with `version >= from_version`, oldest first.
    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Every event in the store, in commit order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Current version of a stream, `None` when it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Stores a snapshot, replacing any previous one for the same stream.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>>;
}

#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Loads the latest snapshot (if any) and the events recorded after it.
    async fn load_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<(Option<Snapshot>, Vec<EventEnvelope>)> {
        match self.get_snapshot(aggregate_id).await? {
            Some(snapshot) => {
                let events = self
                    .get_events_for_aggregate_from_version(aggregate_id, snapshot.version.next())
                    .await?;
                Ok((Some(snapshot), events))
            }
            None => Ok((None, self.get_events_for_aggregate(aggregate_id).await?)),
        }
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch is well formed: non-empty, one append per stream, and
/// each append a contiguous run of versions on a single stream.
pub fn validate_commit(batch: &[StreamAppend]) -> Result<()> {
    if batch.is_empty() {
        return Err(EventStoreError::InvalidAppend("empty commit".into()));
    }

    let mut seen = HashSet::with_capacity(batch.len());
    for append in batch {
        validate_stream(&append.events)?;
        let id = append.events[0].aggregate_id;
        if !seen.insert(id) {
            return Err(EventStoreError::InvalidAppend(format!(
                "stream {id} appears more than once in the commit"
            )));
        }
    }
    Ok(())
}

/// Counts appended events and rejected commits.
pub(crate) fn record_commit(events: usize, result: &Result<Vec<Version>>) {
    match result {
        Ok(versions) => {
            metrics::counter!("event_store_events_appended_total").increment(events as u64);
            tracing::debug!(streams = versions.len(), events, "commit applied");
        }
        Err(e) if e.is_conflict() => {
            metrics::counter!("event_store_conflicts_total").increment(1);
            tracing::debug!(error = %e, "commit rejected");
        }
        Err(e) => tracing::warn!(error = %e, "commit failed"),
    }
}

fn validate_stream(events: &[EventEnvelope]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty event list".into(),
        ));
    };

    let mut expected = first.version;
    for event in &events[1..] {
        if event.aggregate_id != first.aggregate_id || event.aggregate_type != first.aggregate_type
        {
            return Err(EventStoreError::InvalidAppend(
                "all events of an append must target the same aggregate".into(),
            ));
        }
        expected = expected.next();
        if event.version != expected {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be sequential: expected {expected}, got {}",
                event.version
            )));
        }
    }
    Ok(())
}
