use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A departure (frequency) recorded for a bus on a given day. Counted into
/// closures for reference only; trips spend balance, they collect no cash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: String,
    pub bus_id: String,
    pub route: String,
    pub trip_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}
