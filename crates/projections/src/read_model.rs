//! Read model trait for query-side views.

/// A queryable view kept up to date by a projection.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries, or 0 while a write is in progress.
    fn count(&self) -> usize;
}
