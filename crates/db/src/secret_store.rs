use chrono::{DateTime, Utc};
use sqlx::Row;

use cashdesk_core::closing::{SecretStore, StoreError, StoredSecret};

use crate::DbPool;

/// Single-row persistence for the rotating authorization code digest.
/// The schema pins the row id to 1 so rotation is always an upsert.
pub struct SqlSecretStore {
    pool: DbPool,
}

impl SqlSecretStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend(error: impl std::fmt::Display) -> StoreError {
    StoreError(error.to_string())
}

#[async_trait::async_trait]
impl SecretStore for SqlSecretStore {
    async fn load(&self) -> Result<Option<StoredSecret>, StoreError> {
        let row = sqlx::query("SELECT code_digest, rotated_at FROM admin_secret WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let digest: Vec<u8> = row.try_get("code_digest").map_err(backend)?;
        let rotated_at: String = row.try_get("rotated_at").map_err(backend)?;

        let digest: [u8; 32] = digest
            .try_into()
            .map_err(|bytes: Vec<u8>| backend(format!("digest has {} bytes", bytes.len())))?;
        let rotated_at = DateTime::parse_from_rfc3339(&rotated_at)
            .map_err(backend)?
            .with_timezone(&Utc);

        Ok(Some(StoredSecret { digest, rotated_at }))
    }

    async fn store(&self, secret: StoredSecret) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO admin_secret (id, code_digest, rotated_at)
             VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 code_digest = excluded.code_digest,
                 rotated_at = excluded.rotated_at",
        )
        .bind(secret.digest.as_slice())
        .bind(secret.rotated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use cashdesk_core::closing::{SecretStore, StoredSecret};

    use super::SqlSecretStore;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn load_is_none_before_first_rotation() {
        let pool = setup().await;
        let store = SqlSecretStore::new(pool);

        assert!(store.load().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn store_then_load_round_trips_the_digest() {
        let pool = setup().await;
        let store = SqlSecretStore::new(pool);

        let secret = StoredSecret { digest: [7u8; 32], rotated_at: Utc::now() };
        store.store(secret.clone()).await.expect("store");

        let loaded = store.load().await.expect("load").expect("present");
        assert_eq!(loaded.digest, [7u8; 32]);
    }

    #[tokio::test]
    async fn rotation_overwrites_the_single_row() {
        let pool = setup().await;
        let store = SqlSecretStore::new(pool.clone());

        store
            .store(StoredSecret { digest: [1u8; 32], rotated_at: Utc::now() })
            .await
            .expect("first rotation");
        store
            .store(StoredSecret { digest: [2u8; 32], rotated_at: Utc::now() })
            .await
            .expect("second rotation");

        let loaded = store.load().await.expect("load").expect("present");
        assert_eq!(loaded.digest, [2u8; 32]);

        let rows = sqlx::query("SELECT COUNT(*) AS count FROM admin_secret")
            .fetch_one(&pool)
            .await
            .expect("count");
        use sqlx::Row;
        assert_eq!(rows.get::<i64, _>("count"), 1);
    }
}
