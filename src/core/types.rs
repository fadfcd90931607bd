use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered account. Credential material never leaves the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Opaque token handed to session stores instead of `id`.
    #[serde(skip_serializing)]
    pub public_token: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a thread or post. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentState {
    #[default]
    Active,
    Deleted,
}

impl ContentState {
    pub fn is_deleted(self) -> bool {
        matches!(self, ContentState::Deleted)
    }
}

impl From<bool> for ContentState {
    fn from(deleted: bool) -> Self {
        if deleted {
            ContentState::Deleted
        } else {
            ContentState::Active
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Creation time in epoch milliseconds; the pagination cursor.
    pub timestamp: i64,
    /// Epoch milliseconds of the latest reply, or `timestamp` before any reply.
    pub last_update: i64,
    pub posts_count: i64,
    #[serde(skip_serializing)]
    pub state: ContentState,
    pub authors: Vec<User>,
    pub posts: Vec<Post>,
}

impl Thread {
    pub fn is_authored_by(&self, user: &User) -> bool {
        self.authors.iter().any(|author| author.id == user.id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub thread_id: i64,
    pub content: String,
    pub timestamp: i64,
    #[serde(skip_serializing)]
    pub state: ContentState,
    pub authors: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BlockRecord {
    pub id: i64,
    pub owner_id: i64,
    pub target_id: i64,
    pub created_at: DateTime<Utc>,
}
