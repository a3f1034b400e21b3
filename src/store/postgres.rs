//! Postgres store
//!
//! One row per bag field in `bot_data`. A batch is written in a single
//! transaction, replacing each bag wholesale (last write wins).

use sqlx::{PgPool, Row};
use tracing::debug;

use super::{BagScope, BagWrite, BotDataStore, DataBag, StorageError};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl BotDataStore for PgStore {
    async fn load_bag(&self, scope: BagScope, key: &str) -> Result<DataBag, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT field, value
            FROM bot_data
            WHERE scope = $1 AND bag_key = $2
            "#,
        )
        .bind(scope.as_str())
        .bind(key)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>("field"), row.get::<Vec<u8>, _>("value")))
            .collect())
    }

    async fn save_bags(&self, batch: &[BagWrite<'_>]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        for write in batch {
            sqlx::query(
                r#"
                DELETE FROM bot_data
                WHERE scope = $1 AND bag_key = $2
                "#,
            )
            .bind(write.scope.as_str())
            .bind(write.key)
            .execute(&mut *tx)
            .await?;

            for (field, value) in write.bag.iter() {
                sqlx::query(
                    r#"
                    INSERT INTO bot_data (scope, bag_key, field, value, updated_at)
                    VALUES ($1, $2, $3, $4, NOW())
                    "#,
                )
                .bind(write.scope.as_str())
                .bind(write.key)
                .bind(field)
                .bind(value)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        debug!(bags = batch.len(), "saved bags to postgres");
        Ok(())
    }
}
