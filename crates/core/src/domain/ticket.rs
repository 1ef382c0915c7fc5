use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

/// A single-use QR ticket consumed by a verifier at boarding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub holder: String,
    pub route: String,
    pub issued_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

/// Outcome of an idempotent mark-used call. `already_used` is true when the
/// ticket had been consumed before this call; the returned ticket reflects
/// the used state either way.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketUse {
    pub already_used: bool,
    pub ticket: Ticket,
}
