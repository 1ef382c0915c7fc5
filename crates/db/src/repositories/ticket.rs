use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use cashdesk_core::domain::ticket::{Ticket, TicketId, TicketUse};

use super::{parse_timestamp, RepositoryError, TicketRepository};
use crate::DbPool;

pub struct SqlTicketRepository {
    pool: DbPool,
}

impl SqlTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const TICKET_COLUMNS: &str = "id, holder, route, issued_at, used, used_at";

fn row_to_ticket(row: &SqliteRow) -> Result<Ticket, RepositoryError> {
    let id: String = row.try_get("id")?;
    let holder: String = row.try_get("holder")?;
    let route: String = row.try_get("route")?;
    let issued_at: String = row.try_get("issued_at")?;
    let used: i64 = row.try_get("used")?;
    let used_at: Option<String> = row.try_get("used_at")?;

    Ok(Ticket {
        id: TicketId(id),
        holder,
        route,
        issued_at: parse_timestamp("issued_at", &issued_at)?,
        used: used != 0,
        used_at: used_at.as_deref().map(|value| parse_timestamp("used_at", value)).transpose()?,
    })
}

#[async_trait::async_trait]
impl TicketRepository for SqlTicketRepository {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM ticket WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_ticket(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, ticket: Ticket) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO ticket (id, holder, route, issued_at, used, used_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 holder = excluded.holder,
                 route = excluded.route",
        )
        .bind(&ticket.id.0)
        .bind(&ticket.holder)
        .bind(&ticket.route)
        .bind(ticket.issued_at.to_rfc3339())
        .bind(i64::from(ticket.used))
        .bind(ticket.used_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_used(&self, id: &TicketId) -> Result<Option<TicketUse>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Guarded flip: only an unused ticket takes the write. A second
        // verifier scanning the same code sees zero rows affected.
        let flipped = sqlx::query("UPDATE ticket SET used = 1, used_at = ? WHERE id = ? AND used = 0")
            .bind(Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM ticket WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;

        match row {
            Some(ref r) => {
                Ok(Some(TicketUse { already_used: flipped == 0, ticket: row_to_ticket(r)? }))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use cashdesk_core::domain::ticket::{Ticket, TicketId};

    use super::SqlTicketRepository;
    use crate::repositories::TicketRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn ticket(id: &str) -> Ticket {
        Ticket {
            id: TicketId(id.to_string()),
            holder: "passenger-42".to_string(),
            route: "terminal-north".to_string(),
            issued_at: Utc::now(),
            used: false,
            used_at: None,
        }
    }

    #[tokio::test]
    async fn mark_used_flips_once_and_reports_replays() {
        let pool = setup().await;
        let repo = SqlTicketRepository::new(pool);

        repo.save(ticket("TKT-001")).await.expect("save");

        let first = repo
            .mark_used(&TicketId("TKT-001".to_string()))
            .await
            .expect("first mark")
            .expect("exists");
        assert!(!first.already_used);
        assert!(first.ticket.used);
        assert!(first.ticket.used_at.is_some());

        let second = repo
            .mark_used(&TicketId("TKT-001".to_string()))
            .await
            .expect("second mark")
            .expect("exists");
        assert!(second.already_used);
        assert!(second.ticket.used);
        // The original consumption timestamp is preserved.
        assert_eq!(second.ticket.used_at, first.ticket.used_at);
    }

    #[tokio::test]
    async fn marking_an_unknown_ticket_returns_none() {
        let pool = setup().await;
        let repo = SqlTicketRepository::new(pool);

        let outcome = repo.mark_used(&TicketId("TKT-404".to_string())).await.expect("mark");
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn save_never_resets_a_consumed_ticket() {
        let pool = setup().await;
        let repo = SqlTicketRepository::new(pool);

        repo.save(ticket("TKT-001")).await.expect("save");
        repo.mark_used(&TicketId("TKT-001".to_string())).await.expect("mark").expect("exists");

        // Upstream re-issue of the same id must not clear the used flag.
        repo.save(ticket("TKT-001")).await.expect("re-save");

        let found = repo
            .find_by_id(&TicketId("TKT-001".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert!(found.used);
    }
}
