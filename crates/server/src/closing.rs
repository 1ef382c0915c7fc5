//! Closing endpoints.
//!
//! - `GET  /api/v1/closure/preview?date=`        — read-only preview of a closure
//! - `POST /api/v1/closure/commit`               — commit a closure (admin code required)
//! - `GET  /api/v1/closure/history?month=&year=` — closures of a month plus rollup

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use cashdesk_core::closing::CommitParams;
use cashdesk_core::domain::closure::{CashClosure, ClosurePreview};
use cashdesk_core::rollup::MonthlySummary;

use crate::state::{closing_error_response, error_response, AppState, ErrorResponse};

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub reference_date: NaiveDate,
    pub system_amount: Decimal,
    pub request_count: u32,
    pub approved_count: u32,
    pub trip_count: u32,
    pub spans_backlog: bool,
}

impl From<ClosurePreview> for PreviewResponse {
    fn from(preview: ClosurePreview) -> Self {
        Self {
            reference_date: preview.reference_date,
            system_amount: preview.system_amount,
            request_count: preview.request_count,
            approved_count: preview.approved_count,
            trip_count: preview.trip_count,
            spans_backlog: preview.spans_backlog,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub date: NaiveDate,
    pub counted_amount: Decimal,
    pub observations: Option<String>,
    pub admin_code: String,
    pub closed_by: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureView {
    pub id: String,
    pub reference_date: NaiveDate,
    pub closed_at: String,
    pub system_amount: Decimal,
    pub counted_amount: Decimal,
    pub difference: Decimal,
    pub outcome: &'static str,
    pub request_count: u32,
    pub linked_count: u32,
    pub trip_count: u32,
    pub closed_by: String,
    pub observations: Option<String>,
}

impl From<CashClosure> for ClosureView {
    fn from(closure: CashClosure) -> Self {
        let outcome = closure.outcome().as_str();
        Self {
            id: closure.id.0,
            reference_date: closure.reference_date,
            closed_at: closure.closed_at.to_rfc3339(),
            system_amount: closure.system_amount,
            counted_amount: closure.counted_amount,
            difference: closure.difference,
            outcome,
            request_count: closure.request_count,
            linked_count: closure.linked_count,
            trip_count: closure.trip_count,
            closed_by: closure.closed_by,
            observations: closure.observations,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub closures: Vec<ClosureView>,
    pub summary: MonthlySummary,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/closure/preview", get(preview))
        .route("/api/v1/closure/commit", post(commit))
        .route("/api/v1/closure/history", get(history))
        .with_state(state)
}

pub async fn preview(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>, ErrorResponse> {
    let preview = state.engine.prepare(query.date).await.map_err(closing_error_response)?;
    Ok(Json(preview.into()))
}

pub async fn commit(
    State(state): State<AppState>,
    Json(body): Json<CommitRequest>,
) -> Result<(StatusCode, Json<ClosureView>), ErrorResponse> {
    let params = CommitParams {
        reference_date: body.date,
        counted_amount: body.counted_amount,
        observations: body.observations,
        closed_by: body.closed_by,
    };

    let closure =
        state.engine.commit(params, &body.admin_code).await.map_err(closing_error_response)?;

    info!(
        event_name = "treasury.closure.committed",
        closure_id = %closure.id.0,
        reference_date = %closure.reference_date,
        linked_count = closure.linked_count,
        difference = %closure.difference,
        "cash closure committed"
    );

    Ok((StatusCode::CREATED, Json(closure.into())))
}

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ErrorResponse> {
    if !(1..=12).contains(&query.month) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("month must be 1 to 12, got {}", query.month),
        ));
    }

    let closures = state.closures.list_for_month(query.month, query.year).await.map_err(
        |error| {
            tracing::error!(
                event_name = "treasury.history.store_error",
                error = %error,
                "history query failed"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
        },
    )?;

    let summary = MonthlySummary::from_closures(query.month, query.year, &closures);
    Ok(Json(HistoryResponse {
        closures: closures.into_iter().map(ClosureView::from).collect(),
        summary,
    }))
}
