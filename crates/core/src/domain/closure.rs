use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClosureId(pub String);

/// Read-time interpretation of a closure's signed difference. The stored
/// value is always the signed number; this label is never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashOutcome {
    PerfectMatch,
    Surplus,
    Shortfall,
}

impl CashOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerfectMatch => "perfect_match",
            Self::Surplus => "surplus",
            Self::Shortfall => "shortfall",
        }
    }
}

/// An immutable record settling a batch of approved top-up requests against
/// a physically counted cash amount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashClosure {
    pub id: ClosureId,
    pub reference_date: NaiveDate,
    pub closed_at: DateTime<Utc>,
    /// Sum of the linked requests' amounts, recomputed at commit time.
    pub system_amount: Decimal,
    /// Operator-entered physical count.
    pub counted_amount: Decimal,
    /// counted_amount - system_amount, signed.
    pub difference: Decimal,
    /// All unlinked requests dated on or before the reference date,
    /// regardless of status.
    pub request_count: u32,
    /// Approved requests actually linked by this closure.
    pub linked_count: u32,
    /// Trips recorded on the reference date. Informational only: trips
    /// consume already-collected balance and never enter the money sums.
    pub trip_count: u32,
    pub closed_by: String,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CashClosure {
    pub fn outcome(&self) -> CashOutcome {
        if self.difference.is_zero() {
            CashOutcome::PerfectMatch
        } else if self.difference > Decimal::ZERO {
            CashOutcome::Surplus
        } else {
            CashOutcome::Shortfall
        }
    }
}

/// Read-only projection of what a closure for a reference date would settle.
/// Computed without side effects; goes stale the moment a commit lands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosurePreview {
    pub reference_date: NaiveDate,
    pub system_amount: Decimal,
    pub request_count: u32,
    pub approved_count: u32,
    pub trip_count: u32,
    /// True when the eligible set reaches back before the reference date,
    /// i.e. this closure would also sweep up prior-day backlog.
    pub spans_backlog: bool,
}
