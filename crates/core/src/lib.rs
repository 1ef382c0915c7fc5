pub mod closing;
pub mod config;
pub mod domain;
pub mod rollup;

pub use closing::{
    sum_amounts, AuthorizationGate, ClosingError, ClosingSnapshot, ClosingStore, ClosureEngine,
    CommitError, CommitParams, GateError, SecretStore, StoreError, StoredSecret,
};
pub use domain::closure::{CashClosure, CashOutcome, ClosureId, ClosurePreview};
pub use domain::request::{PaymentMethod, RequestId, RequestStatus, RequesterRole, TopUpRequest};
pub use domain::ticket::{Ticket, TicketId, TicketUse};
pub use domain::trip::TripRecord;
pub use rollup::MonthlySummary;

pub use chrono;
pub use rust_decimal;
