use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use cashdesk_core::domain::closure::{CashClosure, ClosureId};
use cashdesk_core::domain::request::{RequestId, TopUpRequest};
use cashdesk_core::domain::ticket::{Ticket, TicketId, TicketUse};
use cashdesk_core::domain::trip::TripRecord;

pub mod closure;
pub mod request;
pub mod ticket;
pub mod trip;

pub use closure::SqlClosureRepository;
pub use request::SqlRequestRepository;
pub use ticket::SqlTicketRepository;
pub use trip::SqlTripLogRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Top-up requests as the closing flow sees them. Status transitions happen
/// upstream (the approval service); linking happens only inside the commit
/// transaction, so no `link` method is exposed here.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<TopUpRequest>, RepositoryError>;
    async fn save(&self, request: TopUpRequest) -> Result<(), RepositoryError>;
    /// Approved, unlinked requests dated on or before `through`, ordered by
    /// id ascending.
    async fn list_approved_through(
        &self,
        through: NaiveDate,
    ) -> Result<Vec<TopUpRequest>, RepositoryError>;
}

#[async_trait]
pub trait ClosureRepository: Send + Sync {
    async fn find_by_id(&self, id: &ClosureId) -> Result<Option<CashClosure>, RepositoryError>;
    async fn list_for_month(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<CashClosure>, RepositoryError>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError>;
    async fn save(&self, ticket: Ticket) -> Result<(), RepositoryError>;
    /// Idempotent single-use transition: the first call flips the ticket to
    /// used, every later call reports `already_used` without changing state.
    /// Returns `None` for an unknown ticket.
    async fn mark_used(&self, id: &TicketId) -> Result<Option<TicketUse>, RepositoryError>;
}

#[async_trait]
pub trait TripLogRepository: Send + Sync {
    async fn record(&self, trip: TripRecord) -> Result<(), RepositoryError>;
    async fn count_on(&self, date: NaiveDate) -> Result<u32, RepositoryError>;
}

pub(crate) fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::from_str(value).map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}
