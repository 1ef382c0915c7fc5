use std::sync::Arc;

use axum::{http::StatusCode, Json};
use serde::Serialize;

use cashdesk_core::closing::{AuthorizationGate, ClosingError, ClosureEngine};
use cashdesk_core::config::AdminConfig;
use cashdesk_db::repositories::{ClosureRepository, TicketRepository};
use cashdesk_db::DbPool;

/// Shared handler state. Everything behind an `Arc` so cloning per request
/// is cheap; the engine and gate are the only writers of treasury state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ClosureEngine>,
    pub gate: Arc<AuthorizationGate>,
    pub closures: Arc<dyn ClosureRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub admin: AdminConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub type ErrorResponse = (StatusCode, Json<ApiError>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (status, Json(ApiError { error: message.into() }))
}

/// One place for the HTTP shape of every closing failure. Storage failures
/// get a generic body; the detail goes to the log, not the client.
pub fn closing_error_response(error: ClosingError) -> ErrorResponse {
    let status = match &error {
        ClosingError::Validation(_) => StatusCode::BAD_REQUEST,
        ClosingError::Unauthorized => StatusCode::UNAUTHORIZED,
        ClosingError::Conflict => StatusCode::CONFLICT,
        ClosingError::NothingToClose(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ClosingError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        ClosingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if let ClosingError::Store(detail) = &error {
        tracing::error!(
            event_name = "treasury.closing.store_error",
            correlation_id = "request",
            error = %detail,
            "closing flow hit a storage failure"
        );
        return error_response(status, "storage failure");
    }

    error_response(status, error.to_string())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::NaiveDate;

    use cashdesk_core::closing::ClosingError;

    use super::closing_error_response;

    #[test]
    fn each_closing_failure_has_a_distinct_status() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");

        let cases = [
            (ClosingError::Validation("bad".to_string()), StatusCode::BAD_REQUEST),
            (ClosingError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ClosingError::Conflict, StatusCode::CONFLICT),
            (ClosingError::NothingToClose(date), StatusCode::UNPROCESSABLE_ENTITY),
            (ClosingError::NotConfigured, StatusCode::SERVICE_UNAVAILABLE),
            (ClosingError::Store("disk".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let (status, _) = closing_error_response(error);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn storage_detail_never_reaches_the_client() {
        let (_, body) = closing_error_response(ClosingError::Store("disk sector 7".to_string()));
        assert_eq!(body.0.error, "storage failure");
    }
}
