//! Monthly rollups over committed closures. Pure aggregation: derived on
//! demand from whatever the storage layer returns, never cached, never
//! mutating.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::closure::CashClosure;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: u32,
    pub year: i32,
    pub closure_count: u32,
    pub counted_total: Decimal,
    pub system_total: Decimal,
    pub difference_total: Decimal,
    pub average_difference: Decimal,
    /// Closures whose counted amount matched the system amount exactly.
    pub exact_matches: u32,
}

impl MonthlySummary {
    pub fn empty(month: u32, year: i32) -> Self {
        Self {
            month,
            year,
            closure_count: 0,
            counted_total: Decimal::ZERO,
            system_total: Decimal::ZERO,
            difference_total: Decimal::ZERO,
            average_difference: Decimal::ZERO,
            exact_matches: 0,
        }
    }

    /// Aggregate the closures of one month. A month with no closures is a
    /// valid all-zero summary, not an error.
    pub fn from_closures(month: u32, year: i32, closures: &[CashClosure]) -> Self {
        if closures.is_empty() {
            return Self::empty(month, year);
        }

        let counted_total: Decimal = closures.iter().map(|c| c.counted_amount).sum();
        let system_total: Decimal = closures.iter().map(|c| c.system_amount).sum();
        let difference_total: Decimal = closures.iter().map(|c| c.difference).sum();
        let exact_matches = closures.iter().filter(|c| c.difference.is_zero()).count() as u32;
        let average_difference = difference_total / Decimal::from(closures.len() as u64);

        Self {
            month,
            year,
            closure_count: closures.len() as u32,
            counted_total,
            system_total,
            difference_total,
            average_difference,
            exact_matches,
        }
    }
}
