use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::service::AuthService;
use crate::core::clock::Clock;
use crate::core::error::{ForumError, ForumResult};
use crate::core::types::{BlockRecord, User};
use crate::storage::database::Database;

pub struct BlockService {
    db: Arc<Database>,
    auth: Arc<AuthService>,
    clock: Arc<dyn Clock>,
}

impl BlockService {
    pub fn new(db: Arc<Database>, auth: Arc<AuthService>, clock: Arc<dyn Clock>) -> Self {
        Self { db, auth, clock }
    }

    /// Block `target_id` for `user`. Blocking someone already blocked is a no-op.
    pub async fn block(&self, user: &User, target_id: i64) -> ForumResult<()> {
        if target_id == user.id {
            return Err(ForumError::BadRecord);
        }

        let target = self.auth.find_by_id(target_id).await?;

        // The (owner_id, target_id) UNIQUE constraint absorbs concurrent duplicates.
        let result = sqlx::query(
            r#"
            INSERT INTO block_records (owner_id, target_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(owner_id, target_id) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(target.id)
        .bind(self.clock.now())
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            debug!(owner_id = user.id, target_id, "target already blocked");
        } else {
            info!(owner_id = user.id, target_id, "blocked user");
        }
        Ok(())
    }

    pub async fn unblock(&self, user: &User, target_id: i64) -> ForumResult<()> {
        let result = sqlx::query("DELETE FROM block_records WHERE owner_id = ? AND target_id = ?")
            .bind(user.id)
            .bind(target_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(ForumError::NotFound);
        }

        info!(owner_id = user.id, target_id, "unblocked user");
        Ok(())
    }

    /// Ids of every user `user` currently blocks.
    pub async fn list_blocked_ids(&self, user: &User) -> ForumResult<BTreeSet<i64>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT target_id FROM block_records WHERE owner_id = ?")
                .bind(user.id)
                .fetch_all(self.db.pool())
                .await?;

        Ok(ids.into_iter().collect())
    }

    pub async fn list_block_records(&self, user: &User) -> ForumResult<Vec<BlockRecord>> {
        let records = sqlx::query_as::<_, BlockRecord>(
            r#"
            SELECT id, owner_id, target_id, created_at
            FROM block_records
            WHERE owner_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user.id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(records)
    }

    pub async fn is_blocked(&self, user: &User, target_id: i64) -> ForumResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM block_records WHERE owner_id = ? AND target_id = ?",
        )
        .bind(user.id)
        .bind(target_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(count > 0)
    }
}
