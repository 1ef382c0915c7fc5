//! Rotation of the closure authorization code. The caller authenticates
//! with the administrator password; only then does the new code reach the
//! gate. The current code is never required: rotation is how a forgotten
//! code gets replaced.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use cashdesk_core::closing::GateError;

use crate::state::{error_response, AppState, ErrorResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateCodeRequest {
    pub current_admin_password: String,
    pub new_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateCodeResponse {
    pub status: &'static str,
    pub rotated_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/api/v1/admin/authorization-code", post(rotate_code)).with_state(state)
}

pub async fn rotate_code(
    State(state): State<AppState>,
    Json(body): Json<RotateCodeRequest>,
) -> Result<Json<RotateCodeResponse>, ErrorResponse> {
    if !state.admin.password_matches(&body.current_admin_password) {
        return Err(error_response(StatusCode::UNAUTHORIZED, "incorrect administrator password"));
    }

    let rotated_at = state.gate.rotate(&body.new_code).await.map_err(|error| match error {
        GateError::MalformedCode => error_response(StatusCode::BAD_REQUEST, error.to_string()),
        other => {
            tracing::error!(
                event_name = "treasury.admin.rotation_failed",
                error = %other,
                "authorization code rotation failed"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
        }
    })?;

    info!(
        event_name = "treasury.admin.code_rotated",
        correlation_id = "admin",
        "authorization code rotated"
    );

    Ok(Json(RotateCodeResponse { status: "rotated", rotated_at: rotated_at.to_rfc3339() }))
}
