use chrono::NaiveDate;
use sqlx::Row;

use cashdesk_core::domain::trip::TripRecord;

use super::{RepositoryError, TripLogRepository};
use crate::DbPool;

pub struct SqlTripLogRepository {
    pool: DbPool,
}

impl SqlTripLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TripLogRepository for SqlTripLogRepository {
    async fn record(&self, trip: TripRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO trip_log (id, bus_id, route, trip_date, recorded_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&trip.id)
        .bind(&trip.bus_id)
        .bind(&trip.route)
        .bind(trip.trip_date.to_string())
        .bind(trip.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_on(&self, date: NaiveDate) -> Result<u32, RepositoryError> {
        let count = sqlx::query("SELECT COUNT(*) AS count FROM trip_log WHERE trip_date = ?")
            .bind(date.to_string())
            .fetch_one(&self.pool)
            .await?
            .get::<i64, _>("count");

        Ok(count as u32)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use cashdesk_core::domain::trip::TripRecord;

    use super::SqlTripLogRepository;
    use crate::repositories::TripLogRepository;
    use crate::{connect_with_settings, migrations};

    fn trip(id: &str, date: NaiveDate) -> TripRecord {
        TripRecord {
            id: id.to_string(),
            bus_id: "BUS-12".to_string(),
            route: "terminal-north".to_string(),
            trip_date: date,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn count_on_only_counts_the_given_day() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlTripLogRepository::new(pool);

        let march_1 = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");
        let march_2 = NaiveDate::from_ymd_opt(2024, 3, 2).expect("date");

        repo.record(trip("TRIP-1", march_1)).await.expect("record");
        repo.record(trip("TRIP-2", march_1)).await.expect("record");
        repo.record(trip("TRIP-3", march_2)).await.expect("record");

        assert_eq!(repo.count_on(march_1).await.expect("count"), 2);
        assert_eq!(repo.count_on(march_2).await.expect("count"), 1);
        assert_eq!(
            repo.count_on(NaiveDate::from_ymd_opt(2024, 3, 3).expect("date"))
                .await
                .expect("count"),
            0
        );
    }
}
