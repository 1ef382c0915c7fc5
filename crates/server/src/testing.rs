//! Handler-test fixtures: a fully wired state over an in-memory database.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use cashdesk_core::closing::{AuthorizationGate, ClosureEngine};
use cashdesk_core::config::AdminConfig;
use cashdesk_core::domain::request::{
    PaymentMethod, RequestId, RequestStatus, RequesterRole, TopUpRequest,
};
use cashdesk_db::repositories::{
    RequestRepository, SqlClosureRepository, SqlRequestRepository, SqlTicketRepository,
};
use cashdesk_db::{connect_with_settings, migrations, SqlClosingStore, SqlSecretStore};

use crate::state::AppState;

pub const ADMIN_CODE: &str = "1234";
pub const ADMIN_PASSWORD: &str = "test-admin-password";

/// Wired state with migrations applied but no authorization code yet.
pub async fn test_state_without_code() -> AppState {
    // One connection keeps the in-memory database visible to every query.
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    let gate = Arc::new(AuthorizationGate::new(Arc::new(SqlSecretStore::new(pool.clone()))));
    let engine = Arc::new(ClosureEngine::new(
        Arc::new(SqlClosingStore::new(pool.clone())),
        Arc::clone(&gate),
    ));

    AppState {
        engine,
        gate,
        closures: Arc::new(SqlClosureRepository::new(pool.clone())),
        tickets: Arc::new(SqlTicketRepository::new(pool.clone())),
        admin: AdminConfig { password: ADMIN_PASSWORD.to_string().into() },
        db_pool: pool,
    }
}

pub async fn test_state() -> AppState {
    let state = test_state_without_code().await;
    state.gate.rotate(ADMIN_CODE).await.expect("seed admin code");
    state
}

pub async fn seed_approved_request(state: &AppState, id: &str, cents: i64, date: NaiveDate) {
    let requests = SqlRequestRepository::new(state.db_pool.clone());
    requests
        .save(TopUpRequest {
            id: RequestId(id.to_string()),
            client_id: "CL-1".to_string(),
            amount: Decimal::new(cents, 2),
            method: PaymentMethod::Cash,
            description: "window top-up".to_string(),
            proof_reference: None,
            requested_by: RequesterRole::Owner,
            status: RequestStatus::Approved,
            closure_id: None,
            request_date: date,
            created_at: Utc::now(),
            decided_at: Some(Utc::now()),
        })
        .await
        .expect("seed request");
}
