use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use super::gate::{is_valid_code, AuthorizationGate, GateError};
use super::{sum_amounts, ClosingError, StoreError};
use crate::domain::closure::{CashClosure, ClosurePreview};
use crate::domain::request::TopUpRequest;

/// What the store sees for a reference date: the closable set plus the
/// informational counts that end up on the closure record.
#[derive(Clone, Debug, PartialEq)]
pub struct ClosingSnapshot {
    /// Approved, unlinked requests dated on or before the reference date,
    /// ordered by id ascending so two previews taken apart are comparable.
    pub eligible: Vec<TopUpRequest>,
    /// All unlinked requests dated on or before the reference date,
    /// whatever their status.
    pub total_considered: u32,
    /// Trips recorded on the reference date itself.
    pub trip_count: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommitParams {
    pub reference_date: NaiveDate,
    pub counted_amount: Decimal,
    pub observations: Option<String>,
    pub closed_by: String,
}

/// Failure modes of the atomic commit. The store must guarantee that on any
/// error no closure row and no link was persisted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("no closable requests on or before {0}")]
    NothingToClose(NaiveDate),
    #[error("concurrent closure consumed the candidate set")]
    Conflict,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Storage port for the closing flow. `commit_closure` must re-read the
/// eligible set, insert the closure, and link that exact set inside one
/// atomic unit of work; it never trusts a previously taken snapshot.
#[async_trait::async_trait]
pub trait ClosingStore: Send + Sync {
    async fn snapshot(&self, through: NaiveDate) -> Result<ClosingSnapshot, StoreError>;
    async fn commit_closure(&self, params: CommitParams) -> Result<CashClosure, CommitError>;
}

pub struct ClosureEngine {
    store: Arc<dyn ClosingStore>,
    gate: Arc<AuthorizationGate>,
}

impl ClosureEngine {
    pub fn new(store: Arc<dyn ClosingStore>, gate: Arc<AuthorizationGate>) -> Self {
        Self { store, gate }
    }

    /// Read-only preview of a closure for `reference_date`. Safe to call any
    /// number of times, concurrently with anything, including an in-flight
    /// commit; the numbers may be stale by the time the operator commits,
    /// which is exactly why `commit` re-reads.
    pub async fn prepare(&self, reference_date: NaiveDate) -> Result<ClosurePreview, ClosingError> {
        let snapshot = self
            .store
            .snapshot(reference_date)
            .await
            .map_err(|error| ClosingError::Store(error.0))?;

        let system_amount = sum_amounts(&snapshot.eligible);
        let spans_backlog =
            snapshot.eligible.iter().any(|request| request.request_date < reference_date);

        Ok(ClosurePreview {
            reference_date,
            system_amount,
            request_count: snapshot.total_considered,
            approved_count: snapshot.eligible.len() as u32,
            trip_count: snapshot.trip_count,
            spans_backlog,
        })
    }

    /// Commit a closure: validate, verify the admin code, then hand the
    /// atomic re-read-and-link to the store. Two legitimate closures on the
    /// same day are allowed; retry safety after a timeout is the caller's
    /// job (re-query history, never blindly resubmit).
    pub async fn commit(
        &self,
        params: CommitParams,
        admin_code: &str,
    ) -> Result<CashClosure, ClosingError> {
        // Fail fast on malformed input, before any store access.
        if params.counted_amount < Decimal::ZERO {
            return Err(ClosingError::Validation(
                "counted amount must not be negative".to_string(),
            ));
        }
        if !is_valid_code(admin_code) {
            return Err(ClosingError::Validation(
                "authorization code must be 4 to 6 digits".to_string(),
            ));
        }
        if params.closed_by.trim().is_empty() {
            return Err(ClosingError::Validation("closed_by must not be empty".to_string()));
        }

        self.gate.verify(admin_code).await.map_err(|error| match error {
            GateError::MalformedCode => {
                ClosingError::Validation("authorization code must be 4 to 6 digits".to_string())
            }
            GateError::NotConfigured => ClosingError::NotConfigured,
            GateError::Incorrect => ClosingError::Unauthorized,
            GateError::Store(store) => ClosingError::Store(store.0),
        })?;

        self.store.commit_closure(params).await.map_err(|error| match error {
            CommitError::NothingToClose(date) => ClosingError::NothingToClose(date),
            CommitError::Conflict => ClosingError::Conflict,
            CommitError::Store(store) => ClosingError::Store(store.0),
        })
    }
}
