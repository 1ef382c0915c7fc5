//! Boarding ticket lookups and the single-use transition. Marking a ticket
//! used is idempotent at the HTTP layer: a replayed scan gets 200 with
//! `alreadyUsed: true` instead of an error, so flaky scanner retries never
//! strand a passenger.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use cashdesk_core::domain::ticket::{Ticket, TicketId};

use crate::state::{error_response, AppState, ErrorResponse};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub id: String,
    pub holder: String,
    pub route: String,
    pub issued_at: String,
    pub used: bool,
    pub used_at: Option<String>,
}

impl From<Ticket> for TicketView {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id.0,
            holder: ticket.holder,
            route: ticket.route,
            issued_at: ticket.issued_at.to_rfc3339(),
            used: ticket.used,
            used_at: ticket.used_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUseResponse {
    pub already_used: bool,
    pub ticket: TicketView,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/tickets/{id}", get(find_ticket))
        .route("/api/v1/tickets/{id}/use", post(use_ticket))
        .with_state(state)
}

pub async fn find_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TicketView>, ErrorResponse> {
    let ticket = state
        .tickets
        .find_by_id(&TicketId(id.clone()))
        .await
        .map_err(storage_failure)?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("unknown ticket `{id}`")))?;

    Ok(Json(ticket.into()))
}

pub async fn use_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TicketUseResponse>, ErrorResponse> {
    let outcome = state
        .tickets
        .mark_used(&TicketId(id.clone()))
        .await
        .map_err(storage_failure)?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("unknown ticket `{id}`")))?;

    Ok(Json(TicketUseResponse {
        already_used: outcome.already_used,
        ticket: outcome.ticket.into(),
    }))
}

fn storage_failure(error: cashdesk_db::repositories::RepositoryError) -> ErrorResponse {
    tracing::error!(
        event_name = "treasury.tickets.store_error",
        error = %error,
        "ticket operation failed"
    );
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
}
