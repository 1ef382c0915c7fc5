//! SQLite adapter for the closing flow. `commit_closure` is the one place
//! in the system allowed to set `closure_id` on a request, and it does so
//! inside a single write-locked transaction: re-read the eligible set,
//! insert the closure row, then link with a guarded UPDATE. If the guard
//! links fewer rows than the re-read returned, a concurrent commit got
//! there first and the whole transaction rolls back.

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use cashdesk_core::closing::{
    sum_amounts, ClosingSnapshot, ClosingStore, CommitError, CommitParams, StoreError,
};
use cashdesk_core::domain::closure::{CashClosure, ClosureId};
use cashdesk_core::domain::request::TopUpRequest;

use crate::repositories::request::{row_to_request, REQUEST_COLUMNS};
use crate::DbPool;

pub struct SqlClosingStore {
    pool: DbPool,
}

impl SqlClosingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend(error: impl std::fmt::Display) -> StoreError {
    StoreError(error.to_string())
}

fn eligible_sql() -> String {
    format!(
        "SELECT {REQUEST_COLUMNS}
         FROM top_up_request
         WHERE status = 'approved' AND closure_id IS NULL AND request_date <= ?
         ORDER BY id ASC"
    )
}

fn decode_requests(rows: &[SqliteRow]) -> Result<Vec<TopUpRequest>, StoreError> {
    rows.iter().map(|row| row_to_request(row).map_err(backend)).collect()
}

#[async_trait::async_trait]
impl ClosingStore for SqlClosingStore {
    async fn snapshot(&self, through: NaiveDate) -> Result<ClosingSnapshot, StoreError> {
        let rows: Vec<SqliteRow> = sqlx::query(&eligible_sql())
            .bind(through.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        let eligible = decode_requests(&rows)?;

        let total_considered = sqlx::query(
            "SELECT COUNT(*) AS count FROM top_up_request
             WHERE closure_id IS NULL AND request_date <= ?",
        )
        .bind(through.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?
        .get::<i64, _>("count") as u32;

        let trip_count = sqlx::query("SELECT COUNT(*) AS count FROM trip_log WHERE trip_date = ?")
            .bind(through.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?
            .get::<i64, _>("count") as u32;

        Ok(ClosingSnapshot { eligible, total_considered, trip_count })
    }

    async fn commit_closure(&self, params: CommitParams) -> Result<CashClosure, CommitError> {
        let reference_date = params.reference_date.to_string();

        // BEGIN IMMEDIATE takes the write lock before the re-read. A plain
        // deferred transaction would read a pre-winner snapshot and then die
        // with SQLITE_BUSY on its first write; with the lock held up front a
        // contending commit waits on busy_timeout and re-reads the settled
        // state, so the loser sees an empty set instead of a lock error.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(backend)?;

        // Never trust an earlier preview; re-read inside the unit of work so
        // this commit settles exactly what it links.
        let rows: Vec<SqliteRow> = sqlx::query(&eligible_sql())
            .bind(&reference_date)
            .fetch_all(&mut *tx)
            .await
            .map_err(backend)?;
        let eligible = decode_requests(&rows)?;

        if eligible.is_empty() {
            return Err(CommitError::NothingToClose(params.reference_date));
        }

        let total_considered = sqlx::query(
            "SELECT COUNT(*) AS count FROM top_up_request
             WHERE closure_id IS NULL AND request_date <= ?",
        )
        .bind(&reference_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?
        .get::<i64, _>("count") as u32;

        let trip_count = sqlx::query("SELECT COUNT(*) AS count FROM trip_log WHERE trip_date = ?")
            .bind(&reference_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(backend)?
            .get::<i64, _>("count") as u32;

        let system_amount = sum_amounts(&eligible);
        let now = Utc::now();
        let closure = CashClosure {
            id: ClosureId(Uuid::new_v4().to_string()),
            reference_date: params.reference_date,
            closed_at: now,
            system_amount,
            counted_amount: params.counted_amount,
            difference: params.counted_amount - system_amount,
            request_count: total_considered,
            linked_count: eligible.len() as u32,
            trip_count,
            closed_by: params.closed_by,
            observations: params.observations,
            created_at: now,
        };

        sqlx::query(
            "INSERT INTO cash_closure (id, reference_date, closed_at, system_amount,
                 counted_amount, difference, request_count, linked_count, trip_count,
                 closed_by, observations, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&closure.id.0)
        .bind(&reference_date)
        .bind(closure.closed_at.to_rfc3339())
        .bind(closure.system_amount.to_string())
        .bind(closure.counted_amount.to_string())
        .bind(closure.difference.to_string())
        .bind(i64::from(closure.request_count))
        .bind(i64::from(closure.linked_count))
        .bind(i64::from(closure.trip_count))
        .bind(&closure.closed_by)
        .bind(&closure.observations)
        .bind(closure.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        // Link exactly the re-read set, guarded by the eligibility predicate
        // itself. A request another commit linked in the meantime no longer
        // matches, rows_affected falls short, and everything above rolls
        // back when the transaction drops.
        let mut builder = QueryBuilder::<sqlx::Sqlite>::new("UPDATE top_up_request SET closure_id = ");
        builder.push_bind(&closure.id.0);
        builder.push(" WHERE status = 'approved' AND closure_id IS NULL AND id IN (");
        let mut separated = builder.separated(", ");
        for request in &eligible {
            separated.push_bind(&request.id.0);
        }
        separated.push_unseparated(")");

        let linked = builder.build().execute(&mut *tx).await.map_err(backend)?.rows_affected();
        if linked != eligible.len() as u64 {
            return Err(CommitError::Conflict);
        }

        tx.commit().await.map_err(backend)?;
        Ok(closure)
    }
}
