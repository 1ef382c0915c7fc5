use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use cashdesk_core::domain::closure::{CashClosure, ClosureId};

use super::{parse_date, parse_decimal, parse_timestamp, ClosureRepository, RepositoryError};
use crate::DbPool;

pub struct SqlClosureRepository {
    pool: DbPool,
}

impl SqlClosureRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) const CLOSURE_COLUMNS: &str = "id, reference_date, closed_at, system_amount, \
     counted_amount, difference, request_count, linked_count, trip_count, closed_by, \
     observations, created_at";

pub(crate) fn row_to_closure(row: &SqliteRow) -> Result<CashClosure, RepositoryError> {
    let id: String = row.try_get("id")?;
    let reference_date: String = row.try_get("reference_date")?;
    let closed_at: String = row.try_get("closed_at")?;
    let system_amount: String = row.try_get("system_amount")?;
    let counted_amount: String = row.try_get("counted_amount")?;
    let difference: String = row.try_get("difference")?;
    let request_count: i64 = row.try_get("request_count")?;
    let linked_count: i64 = row.try_get("linked_count")?;
    let trip_count: i64 = row.try_get("trip_count")?;
    let closed_by: String = row.try_get("closed_by")?;
    let observations: Option<String> = row.try_get("observations")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(CashClosure {
        id: ClosureId(id),
        reference_date: parse_date("reference_date", &reference_date)?,
        closed_at: parse_timestamp("closed_at", &closed_at)?,
        system_amount: parse_decimal("system_amount", &system_amount)?,
        counted_amount: parse_decimal("counted_amount", &counted_amount)?,
        difference: parse_decimal("difference", &difference)?,
        request_count: request_count as u32,
        linked_count: linked_count as u32,
        trip_count: trip_count as u32,
        closed_by,
        observations,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

/// First day of the month and first day of the following month, for
/// half-open range queries over the TEXT-encoded reference date.
pub(crate) fn month_bounds(month: u32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, end))
}

#[async_trait::async_trait]
impl ClosureRepository for SqlClosureRepository {
    async fn find_by_id(&self, id: &ClosureId) -> Result<Option<CashClosure>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CLOSURE_COLUMNS} FROM cash_closure WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_closure(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_month(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<CashClosure>, RepositoryError> {
        let (start, end) = month_bounds(month, year)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid month {month}/{year}")))?;

        let rows: Vec<SqliteRow> = sqlx::query(&format!(
            "SELECT {CLOSURE_COLUMNS}
             FROM cash_closure
             WHERE reference_date >= ? AND reference_date < ?
             ORDER BY reference_date ASC, closed_at ASC"
        ))
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_closure).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use cashdesk_core::domain::closure::ClosureId;

    use super::{month_bounds, SqlClosureRepository};
    use crate::repositories::ClosureRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    async fn insert_closure(pool: &sqlx::SqlitePool, id: &str, reference_date: &str) {
        sqlx::query(
            "INSERT INTO cash_closure (id, reference_date, closed_at, system_amount,
                 counted_amount, difference, request_count, linked_count, trip_count,
                 closed_by, observations, created_at)
             VALUES (?, ?, ?, '45.00', '44.00', '-1.00', 3, 3, 12, 'treasurer-1', NULL, ?)",
        )
        .bind(id)
        .bind(reference_date)
        .bind(format!("{reference_date}T18:30:00Z"))
        .bind(format!("{reference_date}T18:30:00Z"))
        .execute(pool)
        .await
        .expect("insert closure");
    }

    #[test]
    fn month_bounds_are_half_open_and_wrap_december() {
        let (start, end) = month_bounds(3, 2024).expect("bounds");
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"));
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 4, 1).expect("date"));

        let (start, end) = month_bounds(12, 2024).expect("bounds");
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 1).expect("date"));
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).expect("date"));

        assert!(month_bounds(13, 2024).is_none());
    }

    #[tokio::test]
    async fn find_by_id_decodes_money_as_decimals() {
        let pool = setup().await;
        insert_closure(&pool, "CLS-1", "2024-03-01").await;

        let repo = SqlClosureRepository::new(pool);
        let closure = repo
            .find_by_id(&ClosureId("CLS-1".to_string()))
            .await
            .expect("find")
            .expect("exists");

        assert_eq!(closure.system_amount, Decimal::new(4500, 2));
        assert_eq!(closure.counted_amount, Decimal::new(4400, 2));
        assert_eq!(closure.difference, Decimal::new(-100, 2));
        assert_eq!(closure.linked_count, 3);
        assert_eq!(closure.trip_count, 12);
    }

    #[tokio::test]
    async fn list_for_month_keeps_only_that_month() {
        let pool = setup().await;
        insert_closure(&pool, "CLS-1", "2024-02-29").await;
        insert_closure(&pool, "CLS-2", "2024-03-01").await;
        insert_closure(&pool, "CLS-3", "2024-03-31").await;
        insert_closure(&pool, "CLS-4", "2024-04-01").await;

        let repo = SqlClosureRepository::new(pool);
        let march = repo.list_for_month(3, 2024).await.expect("list");
        let ids: Vec<&str> = march.iter().map(|c| c.id.0.as_str()).collect();
        assert_eq!(ids, vec!["CLS-2", "CLS-3"]);

        let may = repo.list_for_month(5, 2024).await.expect("list empty");
        assert!(may.is_empty());
    }
}
