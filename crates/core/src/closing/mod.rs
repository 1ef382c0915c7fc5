//! The cash-closing (reconciliation) core: the authorization gate, the
//! closure engine, and the storage ports both are injected with.
//!
//! The engine owns validation, authorization gating, and preview math; the
//! `ClosingStore` implementation owns atomicity. A commit either persists
//! the closure row and every link, or persists nothing at all.

pub mod engine;
pub mod gate;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::request::TopUpRequest;

pub use engine::{ClosingSnapshot, ClosingStore, ClosureEngine, CommitError, CommitParams};
pub use gate::{AuthorizationGate, GateError, SecretStore, StoredSecret};

/// Backend failure surfaced through a storage port.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("storage failure: {0}")]
pub struct StoreError(pub String);

/// Caller-facing failure taxonomy for the closing flow. Each variant maps
/// to a distinct, non-interchangeable condition; see the engine for where
/// each is raised.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClosingError {
    #[error("validation failed: {0}")]
    Validation(String),
    /// Wrong code. Deliberately generic: says nothing about whether a code
    /// is configured at all.
    #[error("incorrect authorization code")]
    Unauthorized,
    /// No authorization code has ever been set; every commit fails
    /// identically until an administrator configures one.
    #[error("authorization code has not been configured")]
    NotConfigured,
    #[error("nothing to close on or before {0}")]
    NothingToClose(NaiveDate),
    /// A concurrent commit consumed part of the candidate set. Re-run the
    /// preview and retry with fresh numbers.
    #[error("concurrent closure consumed the candidate set")]
    Conflict,
    #[error("storage failure: {0}")]
    Store(String),
}

/// Decimal-safe sum of request amounts. Both the preview and the commit
/// path must go through here so the persisted system amount can never
/// diverge from what the operator was shown for the same set.
pub fn sum_amounts(requests: &[TopUpRequest]) -> Decimal {
    requests.iter().map(|request| request.amount).sum()
}
