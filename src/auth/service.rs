use std::sync::Arc;
use tokio::task;
use tracing::{info, warn};

use crate::core::clock::Clock;
use crate::core::error::{ForumError, ForumResult};
use crate::core::types::User;
use crate::crypto::service::CryptoService;
use crate::storage::database::Database;
use crate::storage::repositories::{UserRow, USER_COLUMNS};
use crate::validation::{validate_password, validate_username};

pub struct AuthService {
    db: Arc<Database>,
    crypto: Arc<CryptoService>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(db: Arc<Database>, crypto: Arc<CryptoService>, clock: Arc<dyn Clock>) -> Self {
        Self { db, crypto, clock }
    }

    /// Register a new user.
    ///
    /// The lookup below only short-circuits the common case; the UNIQUE
    /// constraint on `username` decides concurrent registrations.
    pub async fn register(&self, username: &str, password: &str) -> ForumResult<User> {
        validate_username(username)?;
        validate_password(password)?;

        if self.find_row_by_username(username).await?.is_some() {
            return Err(ForumError::AlreadyExists);
        }

        let password_hash = self.hash_password(password).await?;
        let public_token = self.crypto.generate_public_token();
        let now = self.clock.now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, public_token, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .bind(&public_token)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(ForumError::from_insert)?;

        info!(user_id = result.last_insert_rowid(), %username, "registered user");

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            public_token,
            created_at: now,
        })
    }

    /// Look up a user by credentials. An unknown username and a wrong password
    /// both come back as `NotFound`.
    pub async fn authenticate(&self, username: &str, password: &str) -> ForumResult<User> {
        let Some(row) = self.find_row_by_username(username).await? else {
            // Unknown usernames pay for a verification too.
            self.verify_dummy(password).await?;
            warn!(%username, "authentication failed");
            return Err(ForumError::NotFound);
        };

        if !self.verify_password(password, &row.password_hash).await? {
            warn!(%username, "authentication failed");
            return Err(ForumError::NotFound);
        }

        Ok(row.into())
    }

    pub async fn find_by_id(&self, user_id: i64) -> ForumResult<User> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(user_id)
                .fetch_optional(self.db.pool())
                .await?;

        row.map(User::from).ok_or(ForumError::NotFound)
    }

    /// Resolve the token a session store holds back into its user.
    pub async fn find_by_public_token(&self, token: &str) -> ForumResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_token = ?"
        ))
        .bind(token)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(User::from).ok_or(ForumError::NotFound)
    }

    pub async fn list_users(&self) -> ForumResult<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(self.db.pool())
                .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn count_users(&self) -> ForumResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn find_row_by_username(&self, username: &str) -> ForumResult<Option<UserRow>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row)
    }

    async fn hash_password(&self, password: &str) -> ForumResult<String> {
        let crypto = Arc::clone(&self.crypto);
        let password = password.to_owned();

        task::spawn_blocking(move || crypto.hash_password(&password))
            .await
            .map_err(|e| ForumError::System(format!("Hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> ForumResult<bool> {
        let crypto = Arc::clone(&self.crypto);
        let password = password.to_owned();
        let hash = hash.to_owned();

        task::spawn_blocking(move || crypto.verify_password(&password, &hash))
            .await
            .map_err(|e| ForumError::System(format!("Verification task failed: {}", e)))?
    }

    async fn verify_dummy(&self, password: &str) -> ForumResult<bool> {
        let crypto = Arc::clone(&self.crypto);
        let password = password.to_owned();

        task::spawn_blocking(move || crypto.verify_dummy(&password))
            .await
            .map_err(|e| ForumError::System(format!("Verification task failed: {}", e)))?
    }
}
