//! Row shapes as they come out of SQLite, and the loaders that attach
//! authors and posts to threads through the join tables.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::collections::HashMap;

use crate::core::error::ForumResult;
use crate::core::types::{Post, Thread, User};

pub(crate) const USER_COLUMNS: &str = "id, username, password_hash, public_token, created_at";

pub(crate) const THREAD_COLUMNS: &str =
    "t.id, t.title, t.content, t.timestamp, t.last_update, t.posts_count, t.deleted";

pub(crate) const POST_COLUMNS: &str = "p.id, tp.thread_id, p.content, p.timestamp, p.deleted";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub public_token: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            public_token: row.public_token,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ThreadRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub timestamp: i64,
    pub last_update: i64,
    pub posts_count: i64,
    pub deleted: bool,
}

impl ThreadRow {
    pub fn into_thread(self, authors: Vec<User>, posts: Vec<Post>) -> Thread {
        Thread {
            id: self.id,
            title: self.title,
            content: self.content,
            timestamp: self.timestamp,
            last_update: self.last_update,
            posts_count: self.posts_count,
            state: self.deleted.into(),
            authors,
            posts,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: i64,
    pub thread_id: i64,
    pub content: String,
    pub timestamp: i64,
    pub deleted: bool,
}

impl PostRow {
    pub fn into_post(self, authors: Vec<User>) -> Post {
        Post {
            id: self.id,
            thread_id: self.thread_id,
            content: self.content,
            timestamp: self.timestamp,
            state: self.deleted.into(),
            authors,
        }
    }
}

/// A user joined to the id of the thread or post they authored.
#[derive(Debug, sqlx::FromRow)]
struct AuthorRow {
    owner_id: i64,
    id: i64,
    username: String,
    public_token: String,
    created_at: DateTime<Utc>,
}

async fn authors_via(
    pool: &Pool<Sqlite>,
    join_table: &str,
    key: &str,
    ids: &[i64],
) -> ForumResult<HashMap<i64, Vec<User>>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT j.{key} AS owner_id, u.id, u.username, u.public_token, u.created_at \
         FROM {join_table} j JOIN users u ON u.id = j.user_id WHERE j.{key} IN ("
    ));
    {
        let mut bound = query.separated(", ");
        for id in ids {
            bound.push_bind(*id);
        }
        bound.push_unseparated(") ORDER BY u.id");
    }

    let rows: Vec<AuthorRow> = query.build_query_as().fetch_all(pool).await?;

    let mut authors: HashMap<i64, Vec<User>> = HashMap::new();
    for row in rows {
        authors.entry(row.owner_id).or_default().push(User {
            id: row.id,
            username: row.username,
            public_token: row.public_token,
            created_at: row.created_at,
        });
    }
    Ok(authors)
}

/// Attaches authors to already-fetched post rows, keeping their order.
pub(crate) async fn hydrate_posts(pool: &Pool<Sqlite>, rows: Vec<PostRow>) -> ForumResult<Vec<Post>> {
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut authors = authors_via(pool, "user_posts", "post_id", &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let post_authors = authors.remove(&row.id).unwrap_or_default();
            row.into_post(post_authors)
        })
        .collect())
}

/// Attaches authors, and optionally the active posts, to fetched thread rows.
pub(crate) async fn hydrate_threads(
    pool: &Pool<Sqlite>,
    rows: Vec<ThreadRow>,
    with_posts: bool,
) -> ForumResult<Vec<Thread>> {
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut authors = authors_via(pool, "user_threads", "thread_id", &ids).await?;
    let mut posts = if with_posts {
        active_posts_of(pool, &ids).await?
    } else {
        HashMap::new()
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let thread_authors = authors.remove(&row.id).unwrap_or_default();
            let thread_posts = posts.remove(&row.id).unwrap_or_default();
            row.into_thread(thread_authors, thread_posts)
        })
        .collect())
}

async fn active_posts_of(
    pool: &Pool<Sqlite>,
    thread_ids: &[i64],
) -> ForumResult<HashMap<i64, Vec<Post>>> {
    if thread_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {POST_COLUMNS} FROM posts p JOIN thread_posts tp ON tp.post_id = p.id \
         WHERE p.deleted = 0 AND tp.thread_id IN ("
    ));
    {
        let mut bound = query.separated(", ");
        for id in thread_ids {
            bound.push_bind(*id);
        }
        bound.push_unseparated(") ORDER BY p.timestamp ASC, p.id ASC");
    }

    let rows: Vec<PostRow> = query.build_query_as().fetch_all(pool).await?;

    let mut grouped: HashMap<i64, Vec<Post>> = HashMap::new();
    for post in hydrate_posts(pool, rows).await? {
        grouped.entry(post.thread_id).or_default().push(post);
    }
    Ok(grouped)
}
