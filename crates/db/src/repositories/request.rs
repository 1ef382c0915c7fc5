use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use cashdesk_core::domain::closure::ClosureId;
use cashdesk_core::domain::request::{
    PaymentMethod, RequestId, RequestStatus, RequesterRole, TopUpRequest,
};

use super::{parse_date, parse_decimal, parse_timestamp, RepositoryError, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn status_as_str(status: &RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "pending",
        RequestStatus::Approved => "approved",
        RequestStatus::Rejected => "rejected",
    }
}

fn parse_status(value: &str) -> RequestStatus {
    match value {
        "approved" => RequestStatus::Approved,
        "rejected" => RequestStatus::Rejected,
        _ => RequestStatus::Pending,
    }
}

pub fn method_as_str(method: &PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "cash",
        PaymentMethod::Transfer => "transfer",
        PaymentMethod::Deposit => "deposit",
    }
}

fn parse_method(value: &str) -> Result<PaymentMethod, RepositoryError> {
    match value {
        "cash" => Ok(PaymentMethod::Cash),
        "transfer" => Ok(PaymentMethod::Transfer),
        "deposit" => Ok(PaymentMethod::Deposit),
        other => Err(RepositoryError::Decode(format!("unknown payment method `{other}`"))),
    }
}

pub fn role_as_str(role: &RequesterRole) -> &'static str {
    match role {
        RequesterRole::Owner => "owner",
        RequesterRole::Driver => "driver",
    }
}

fn parse_role(value: &str) -> Result<RequesterRole, RepositoryError> {
    match value {
        "owner" => Ok(RequesterRole::Owner),
        "driver" => Ok(RequesterRole::Driver),
        other => Err(RepositoryError::Decode(format!("unknown requester role `{other}`"))),
    }
}

pub(crate) const REQUEST_COLUMNS: &str = "id, client_id, amount, method, description, \
     proof_reference, requested_by, status, closure_id, request_date, created_at, decided_at";

pub(crate) fn row_to_request(row: &SqliteRow) -> Result<TopUpRequest, RepositoryError> {
    let id: String = row.try_get("id")?;
    let client_id: String = row.try_get("client_id")?;
    let amount: String = row.try_get("amount")?;
    let method: String = row.try_get("method")?;
    let description: String = row.try_get("description")?;
    let proof_reference: Option<String> = row.try_get("proof_reference")?;
    let requested_by: String = row.try_get("requested_by")?;
    let status: String = row.try_get("status")?;
    let closure_id: Option<String> = row.try_get("closure_id")?;
    let request_date: String = row.try_get("request_date")?;
    let created_at: String = row.try_get("created_at")?;
    let decided_at: Option<String> = row.try_get("decided_at")?;

    Ok(TopUpRequest {
        id: RequestId(id),
        client_id,
        amount: parse_decimal("amount", &amount)?,
        method: parse_method(&method)?,
        description,
        proof_reference,
        requested_by: parse_role(&requested_by)?,
        status: parse_status(&status),
        closure_id: closure_id.map(ClosureId),
        request_date: parse_date("request_date", &request_date)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        decided_at: decided_at
            .as_deref()
            .map(|value| parse_timestamp("decided_at", value))
            .transpose()?,
    })
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<TopUpRequest>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM top_up_request WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request: TopUpRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO top_up_request (id, client_id, amount, method, description,
                                         proof_reference, requested_by, status, closure_id,
                                         request_date, created_at, decided_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 client_id = excluded.client_id,
                 amount = excluded.amount,
                 method = excluded.method,
                 description = excluded.description,
                 proof_reference = excluded.proof_reference,
                 requested_by = excluded.requested_by,
                 status = excluded.status,
                 decided_at = excluded.decided_at",
        )
        .bind(&request.id.0)
        .bind(&request.client_id)
        .bind(request.amount.to_string())
        .bind(method_as_str(&request.method))
        .bind(&request.description)
        .bind(&request.proof_reference)
        .bind(role_as_str(&request.requested_by))
        .bind(status_as_str(&request.status))
        .bind(request.closure_id.as_ref().map(|id| id.0.clone()))
        .bind(request.request_date.to_string())
        .bind(request.created_at.to_rfc3339())
        .bind(request.decided_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_approved_through(
        &self,
        through: NaiveDate,
    ) -> Result<Vec<TopUpRequest>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS}
             FROM top_up_request
             WHERE status = 'approved' AND closure_id IS NULL AND request_date <= ?
             ORDER BY id ASC"
        ))
        .bind(through.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }
}
