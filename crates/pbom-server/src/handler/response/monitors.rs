//! Monitor response types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::service::StatsSnapshot;

/// Intake counters reported by `GET /status`.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Number of events handed to enrichment since startup.
    pub events_processed: u64,
    /// Time of the most recent accepted event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_at: Option<Timestamp>,
}

impl From<StatsSnapshot> for ServiceStatus {
    fn from(snapshot: StatsSnapshot) -> Self {
        Self {
            events_processed: snapshot.events_processed,
            last_event_at: snapshot.last_event_at,
        }
    }
}
