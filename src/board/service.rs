use sqlx::{QueryBuilder, Sqlite};
use std::sync::Arc;
use tracing::{debug, info};

use crate::blocking::service::BlockService;
use crate::core::clock::Clock;
use crate::core::error::{ForumError, ForumResult};
use crate::core::types::{Post, Thread, User};
use crate::storage::database::Database;
use crate::storage::repositories::{
    hydrate_posts, hydrate_threads, PostRow, ThreadRow, POST_COLUMNS, THREAD_COLUMNS,
};
use crate::validation::{validate_content, validate_title};

pub struct BoardService {
    db: Arc<Database>,
    blocking: Arc<BlockService>,
    clock: Arc<dyn Clock>,
}

impl BoardService {
    pub fn new(db: Arc<Database>, blocking: Arc<BlockService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            blocking,
            clock,
        }
    }

    /// Create a new thread with `author` as its sole author.
    pub async fn create_thread(&self, author: &User, title: &str, content: &str) -> ForumResult<Thread> {
        validate_title(title)?;
        validate_content(content)?;

        let timestamp = self.clock.now_millis();
        let mut tx = self.db.pool().begin().await?;

        let thread_id = sqlx::query(
            r#"
            INSERT INTO threads (title, content, timestamp, last_update, posts_count, deleted)
            VALUES (?, ?, ?, ?, 0, 0)
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(timestamp)
        .bind(timestamp)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("INSERT INTO user_threads (user_id, thread_id) VALUES (?, ?)")
            .bind(author.id)
            .bind(thread_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(thread_id, author_id = author.id, "created thread");

        Ok(Thread {
            id: thread_id,
            title: title.to_string(),
            content: content.to_string(),
            timestamp,
            last_update: timestamp,
            posts_count: 0,
            state: Default::default(),
            authors: vec![author.clone()],
            posts: Vec::new(),
        })
    }

    /// Create a post (reply to thread).
    ///
    /// The post, its join rows and the thread's activity bump commit together
    /// or not at all.
    pub async fn reply_to_thread(&self, author: &User, thread_id: i64, content: &str) -> ForumResult<Post> {
        validate_content(content)?;

        let timestamp = self.clock.now_millis();
        let mut tx = self.db.pool().begin().await?;

        // The bump must be the first statement: a deferred transaction that
        // reads first cannot upgrade to a writer once another connection commits.
        // MAX keeps last_update >= timestamp even if the wall clock stepped back.
        let bumped = sqlx::query(
            r#"
            UPDATE threads
            SET last_update = MAX(timestamp, ?), posts_count = posts_count + 1
            WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(timestamp)
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;
        if bumped.rows_affected() == 0 {
            return Err(ForumError::NotFound);
        }

        let post_id = sqlx::query("INSERT INTO posts (content, timestamp, deleted) VALUES (?, ?, 0)")
            .bind(content)
            .bind(timestamp)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query("INSERT INTO thread_posts (thread_id, post_id) VALUES (?, ?)")
            .bind(thread_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_posts (user_id, post_id) VALUES (?, ?)")
            .bind(author.id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(post_id, thread_id, author_id = author.id, "replied to thread");

        Ok(Post {
            id: post_id,
            thread_id,
            content: content.to_string(),
            timestamp,
            state: Default::default(),
            authors: vec![author.clone()],
        })
    }

    /// Get an active thread with its authors attached.
    pub async fn find_thread(&self, thread_id: i64) -> ForumResult<Thread> {
        let row: Option<ThreadRow> = sqlx::query_as(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads t WHERE t.id = ? AND t.deleted = 0"
        ))
        .bind(thread_id)
        .fetch_optional(self.db.pool())
        .await?;

        self.single_thread(row).await
    }

    /// Like [`find_thread`](Self::find_thread), but only if `user` is one of its authors.
    pub async fn find_thread_owned_by(&self, user: &User, thread_id: i64) -> ForumResult<Thread> {
        let row: Option<ThreadRow> = sqlx::query_as(&format!(
            r#"
            SELECT {THREAD_COLUMNS}
            FROM threads t
            JOIN user_threads ut ON ut.thread_id = t.id
            WHERE t.id = ? AND ut.user_id = ? AND t.deleted = 0
            "#
        ))
        .bind(thread_id)
        .bind(user.id)
        .fetch_optional(self.db.pool())
        .await?;

        self.single_thread(row).await
    }

    /// An active post, only if `user` is one of its authors.
    pub async fn find_post_owned_by(&self, user: &User, post_id: i64) -> ForumResult<Post> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN thread_posts tp ON tp.post_id = p.id
            JOIN user_posts up ON up.post_id = p.id
            WHERE p.id = ? AND up.user_id = ? AND p.deleted = 0
            "#
        ))
        .bind(post_id)
        .bind(user.id)
        .fetch_optional(self.db.pool())
        .await?;

        let row = row.ok_or(ForumError::NotFound)?;
        hydrate_posts(self.db.pool(), vec![row])
            .await?
            .pop()
            .ok_or(ForumError::NotFound)
    }

    /// Soft-delete a thread. Missing, already deleted and not-yours all
    /// surface as `NotFound`.
    pub async fn delete_thread(&self, user: &User, thread_id: i64) -> ForumResult<()> {
        let thread = self.find_thread_owned_by(user, thread_id).await?;

        sqlx::query("UPDATE threads SET deleted = 1 WHERE id = ? AND deleted = 0")
            .bind(thread.id)
            .execute(self.db.pool())
            .await?;

        info!(thread_id, user_id = user.id, "deleted thread");
        Ok(())
    }

    /// Soft-delete a post. The thread's post counter is left as it was.
    pub async fn delete_post(&self, user: &User, post_id: i64) -> ForumResult<()> {
        let post = self.find_post_owned_by(user, post_id).await?;

        sqlx::query("UPDATE posts SET deleted = 1 WHERE id = ? AND deleted = 0")
            .bind(post.id)
            .execute(self.db.pool())
            .await?;

        info!(post_id, user_id = user.id, "deleted post");
        Ok(())
    }

    /// Active threads created before `before`, most recently active first,
    /// with authors and posts attached.
    ///
    /// The page boundary is the creation `timestamp` while the order is
    /// `last_update`. Once replies bump older threads, paging with the last
    /// item's `timestamp` can repeat a thread on several pages or skip
    /// threads entirely. Without replies it visits every thread once.
    pub async fn list_latest_threads(&self, before: i64, limit: i64) -> ForumResult<Vec<Thread>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        debug!(before, limit, "listing latest threads");

        let rows: Vec<ThreadRow> = sqlx::query_as(&format!(
            r#"
            SELECT {THREAD_COLUMNS}
            FROM threads t
            WHERE t.timestamp < ? AND t.deleted = 0
            ORDER BY t.last_update DESC, t.id DESC
            LIMIT ?
            "#
        ))
        .bind(before)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        hydrate_threads(self.db.pool(), rows, true).await
    }

    /// [`list_latest_threads`](Self::list_latest_threads) minus threads
    /// written only by users that `user` blocks.
    pub async fn list_latest_threads_for_user(
        &self,
        user: &User,
        before: i64,
        limit: i64,
    ) -> ForumResult<Vec<Thread>> {
        let blocked = self.blocking.list_blocked_ids(user).await?;
        if blocked.is_empty() {
            return self.list_latest_threads(before, limit).await;
        }
        if limit <= 0 {
            return Ok(Vec::new());
        }
        debug!(user_id = user.id, before, limit, blocked = blocked.len(), "listing latest threads for user");

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {THREAD_COLUMNS} FROM threads t WHERE t.deleted = 0 AND t.timestamp < "
        ));
        query.push_bind(before);
        query.push(
            " AND EXISTS (SELECT 1 FROM user_threads ut \
             WHERE ut.thread_id = t.id AND ut.user_id NOT IN (",
        );
        {
            let mut bound = query.separated(", ");
            for id in &blocked {
                bound.push_bind(*id);
            }
            bound.push_unseparated(")) ORDER BY t.last_update DESC, t.id DESC LIMIT ");
        }
        query.push_bind(limit);

        let rows: Vec<ThreadRow> = query.build_query_as().fetch_all(self.db.pool()).await?;

        hydrate_threads(self.db.pool(), rows, true).await
    }

    /// Active posts of an active thread created before `before`, oldest first.
    pub async fn list_posts_for_thread(&self, before: i64, limit: i64, thread_id: i64) -> ForumResult<Vec<Post>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        debug!(thread_id, before, limit, "listing posts for thread");

        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN thread_posts tp ON tp.post_id = p.id
            JOIN threads t ON t.id = tp.thread_id
            WHERE tp.thread_id = ? AND p.timestamp < ? AND p.deleted = 0 AND t.deleted = 0
            ORDER BY p.timestamp ASC, p.id ASC
            LIMIT ?
            "#
        ))
        .bind(thread_id)
        .bind(before)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        hydrate_posts(self.db.pool(), rows).await
    }

    /// Active posts across every active thread created before `before`, newest first.
    pub async fn list_latest_posts(&self, before: i64, limit: i64) -> ForumResult<Vec<Post>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN thread_posts tp ON tp.post_id = p.id
            JOIN threads t ON t.id = tp.thread_id
            WHERE p.timestamp < ? AND p.deleted = 0 AND t.deleted = 0
            ORDER BY p.timestamp DESC, p.id DESC
            LIMIT ?
            "#
        ))
        .bind(before)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        hydrate_posts(self.db.pool(), rows).await
    }

    pub async fn count_threads(&self) -> ForumResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM threads WHERE deleted = 0")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn count_posts_for_thread(&self, thread_id: i64) -> ForumResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM posts p
            JOIN thread_posts tp ON tp.post_id = p.id
            WHERE tp.thread_id = ? AND p.deleted = 0
            "#,
        )
        .bind(thread_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }

    async fn single_thread(&self, row: Option<ThreadRow>) -> ForumResult<Thread> {
        let row = row.ok_or(ForumError::NotFound)?;
        hydrate_threads(self.db.pool(), vec![row], false)
            .await?
            .pop()
            .ok_or(ForumError::NotFound)
    }
}
