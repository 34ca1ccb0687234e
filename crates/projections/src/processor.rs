//! Feeds store events to registered projections.

use event_store::{EventEnvelope, EventStore};
use futures_util::StreamExt;

use crate::Result;
use crate::projection::Projection;

/// Delivers events from an event store to projections.
///
/// - `run_catch_up` replays the whole store; each projection's checkpoint
///   skips what it already applied, so running it repeatedly is safe.
/// - `process_event` delivers one freshly committed event.
/// - `rebuild_all` resets every projection and replays from scratch.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Replays every stored event into every projection. Returns the number
    /// of (event, projection) deliveries that changed a read model.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let mut stream = self.store.stream_all_events().await?;
        let mut seen: u64 = 0;
        let mut applied: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            seen += 1;
            applied += self.deliver(&event).await?;
        }

        tracing::info!(events_seen = seen, applied, "catch-up complete");
        Ok(applied)
    }

    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn process_event(&self, event: &EventEnvelope) -> Result<u64> {
        self.deliver(event).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.run_catch_up().await
    }

    async fn deliver(&self, event: &EventEnvelope) -> Result<u64> {
        let mut applied = 0;
        for projection in &self.projections {
            if projection.handle(event).await? {
                metrics::counter!("projections_events_processed", "projection" => projection.name())
                    .increment(1);
                applied += 1;
            }
        }
        Ok(applied)
    }
}
