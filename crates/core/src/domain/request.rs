use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::closure::ClosureId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Deposit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequesterRole {
    Owner,
    Driver,
}

/// A balance top-up request raised by an owner or driver and decided by
/// treasury. Once a cash closure consumes it, `closure_id` is set exactly
/// once and never cleared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub id: RequestId,
    pub client_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub description: String,
    pub proof_reference: Option<String>,
    pub requested_by: RequesterRole,
    pub status: RequestStatus,
    pub closure_id: Option<ClosureId>,
    pub request_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl TopUpRequest {
    /// Approved and not yet swept into a cash closure.
    pub fn is_closable(&self) -> bool {
        self.status == RequestStatus::Approved && self.closure_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{PaymentMethod, RequestId, RequestStatus, RequesterRole, TopUpRequest};
    use crate::domain::closure::ClosureId;

    fn request(status: RequestStatus, closure_id: Option<ClosureId>) -> TopUpRequest {
        TopUpRequest {
            id: RequestId("REQ-1".to_string()),
            client_id: "CL-7".to_string(),
            amount: Decimal::new(1000, 2),
            method: PaymentMethod::Cash,
            description: "window deposit".to_string(),
            proof_reference: None,
            requested_by: RequesterRole::Driver,
            status,
            closure_id,
            request_date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
            created_at: Utc::now(),
            decided_at: Some(Utc::now()),
        }
    }

    #[test]
    fn approved_unlinked_request_is_closable() {
        assert!(request(RequestStatus::Approved, None).is_closable());
    }

    #[test]
    fn pending_rejected_or_linked_requests_are_not_closable() {
        assert!(!request(RequestStatus::Pending, None).is_closable());
        assert!(!request(RequestStatus::Rejected, None).is_closable());
        assert!(!request(
            RequestStatus::Approved,
            Some(ClosureId("CLS-1".to_string()))
        )
        .is_closable());
    }
}
