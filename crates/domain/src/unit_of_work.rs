use event_store::{CORRELATION_KEY, EventStore, StreamAppend, Version};

use crate::aggregate::Aggregate;
use crate::command::{CommandResult, Staged};
use crate::error::DomainError;

/// Staged changes to several aggregates, committed as one atomic write.
///
/// Either every stream advances or none does. A stale expectation on any
/// stream fails the whole unit with `ConcurrencyConflict`.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    appends: Vec<StreamAppend>,
    correlation_id: Option<String>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags every event written by this unit with a correlation id.
    pub fn correlated(correlation_id: impl Into<String>) -> Self {
        Self {
            appends: Vec::new(),
            correlation_id: Some(correlation_id.into()),
        }
    }

    /// Adds a staged change and hands back its would-be result.
    pub fn include<A: Aggregate>(&mut self, staged: Staged<A>) -> CommandResult<A> {
        let (result, append) = staged.into_parts();
        if let Some(append) = append {
            self.appends.push(append);
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.appends.is_empty()
    }

    pub fn stream_count(&self) -> usize {
        self.appends.len()
    }

    #[tracing::instrument(skip(self, store), fields(streams = self.appends.len()))]
    pub async fn commit<S: EventStore + ?Sized>(self, store: &S) -> Result<Vec<Version>, DomainError> {
        if self.appends.is_empty() {
            return Ok(Vec::new());
        }

        let mut appends = self.appends;
        if let Some(correlation_id) = &self.correlation_id {
            for event in appends.iter_mut().flat_map(|a| a.events.iter_mut()) {
                event.metadata.insert(
                    CORRELATION_KEY.to_string(),
                    serde_json::Value::String(correlation_id.clone()),
                );
            }
        }

        Ok(store.commit(appends).await?)
    }
}
