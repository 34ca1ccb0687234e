use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateId, Result, Version};

/// Serialized aggregate state at a given stream version.
///
/// Loading starts from the snapshot and replays only the events recorded
/// after `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    pub version: Version,
    pub timestamp: DateTime<Utc>,
    pub state: serde_json::Value,
}

impl Snapshot {
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: serde_json::Value,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            timestamp: Utc::now(),
            state,
        }
    }

    pub fn from_state<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: &T,
    ) -> Result<Self> {
        Ok(Self::new(
            aggregate_id,
            aggregate_type,
            version,
            serde_json::to_value(state)?,
        ))
    }

    pub fn into_state<T: for<'de> Deserialize<'de>>(self) -> Result<T> {
        Ok(serde_json::from_value(self.state)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct StockState {
        stock: u32,
        active: bool,
    }

    #[test]
    fn state_survives_snapshot() {
        let id = AggregateId::new();
        let original = StockState {
            stock: 12,
            active: true,
        };

        let snapshot = Snapshot::from_state(id, "Product", Version::new(50), &original).unwrap();
        assert_eq!(snapshot.aggregate_type, "Product");
        assert_eq!(snapshot.version, Version::new(50));

        let restored: StockState = snapshot.into_state().unwrap();
        assert_eq!(restored, original);
    }
}
