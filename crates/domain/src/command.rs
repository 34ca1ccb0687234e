//! Command handling: load, decide, persist.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreExt, Snapshot, StreamAppend, Version,
};
use serde::de::DeserializeOwned;

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

/// Outcome of a persisted command.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate with the new events applied.
    pub aggregate: A,

    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// Events decided against one aggregate, not yet written.
///
/// The aggregate already has the events applied and its version advanced, so
/// several staged changes can be inspected before they are committed together
/// through a [`UnitOfWork`](crate::UnitOfWork).
#[derive(Debug)]
pub struct Staged<A: Aggregate> {
    pub aggregate: A,
    pub events: Vec<A::Event>,
    append: Option<StreamAppend>,
}

impl<A: Aggregate> Staged<A> {
    /// True when the command produced no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn into_parts(self) -> (CommandResult<A>, Option<StreamAppend>) {
        let new_version = self.aggregate.version();
        (
            CommandResult {
                aggregate: self.aggregate,
                events: self.events,
                new_version,
            },
            self.append,
        )
    }
}

/// Loads aggregates of type `A` and persists the events their commands emit.
///
/// Every write carries the loaded version as its expectation, so a concurrent
/// writer to the same stream surfaces as `ConcurrencyConflict`.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate + DeserializeOwned,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds an aggregate from its snapshot and subsequent events.
    ///
    /// A stream with no events yields `A::default()`.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => Self::restore_from_snapshot(snapshot)?,
            None => A::default(),
        };

        for envelope in events {
            let event: A::Event = envelope.decode()?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Like [`load`](Self::load) but `None` for a stream that was never created.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Turns already-decided events into a staged change against `aggregate`.
    pub fn decide(
        &self,
        aggregate_id: AggregateId,
        mut aggregate: A,
        events: Vec<A::Event>,
    ) -> Result<Staged<A>, DomainError> {
        if events.is_empty() {
            return Ok(Staged {
                aggregate,
                events,
                append: None,
            });
        }

        let current_version = aggregate.version();
        let envelopes = Self::build_envelopes(aggregate_id, current_version, &events)?;
        let append = StreamAppend::new(envelopes, AppendOptions::expect_version(current_version));

        aggregate.apply_events(events.iter().cloned());
        aggregate.set_version(append.last_version());

        Ok(Staged {
            aggregate,
            events,
            append: Some(append),
        })
    }

    /// Loads the aggregate and runs `command_fn` against it without writing.
    pub async fn stage<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<Staged<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.load(aggregate_id).await?;
        let events = command_fn(&aggregate)?;
        self.decide(aggregate_id, aggregate, events)
    }

    /// Loads, runs `command_fn`, and appends the resulting events.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let staged = self.stage(aggregate_id, command_fn).await?;
        self.commit(staged).await
    }

    /// Writes a single staged change on its own.
    pub async fn commit(&self, staged: Staged<A>) -> Result<CommandResult<A>, DomainError> {
        let (result, append) = staged.into_parts();

        if let Some(append) = append {
            self.store.commit(vec![append]).await?;
        }

        Ok(result)
    }

    fn build_envelopes(
        aggregate_id: AggregateId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .build()?;
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }

    fn restore_from_snapshot(snapshot: Snapshot) -> Result<A, DomainError> {
        let version = snapshot.version;
        let mut aggregate: A = snapshot.into_state()?;
        aggregate.set_version(version);
        Ok(aggregate)
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
{
    /// Executes a command, then stores a snapshot if the new version is due.
    pub async fn execute_with_snapshot<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let result = self.execute(aggregate_id, command_fn).await?;
        self.snapshot_if_due(aggregate_id, &result.aggregate).await?;
        Ok(result)
    }

    /// Stores a snapshot of an already-committed aggregate when its version
    /// lands on the snapshot interval.
    pub async fn snapshot_if_due(
        &self,
        aggregate_id: AggregateId,
        aggregate: &A,
    ) -> Result<(), DomainError> {
        if aggregate.should_snapshot() {
            let snapshot = Snapshot::from_state(
                aggregate_id,
                A::aggregate_type(),
                aggregate.version(),
                aggregate,
            )?;
            self.store.save_snapshot(snapshot).await?;
        }
        Ok(())
    }
}
