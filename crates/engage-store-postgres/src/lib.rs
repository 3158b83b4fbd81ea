//! PostgreSQL implementation of the engagement record stores.
//!
//! One [`PgRecordStore`] serves all four record kinds; each kind lives in its
//! own table.
//!
//! # Features
//!
//! - Unique indexes back the one-per-target rule for comments, reviews and
//!   reports; a violation surfaces as [`UniqueViolation`]
//! - Like counters move with a single `UPDATE`, floored at zero
//! - Newest-first paged listings by target, by owner and (reports) by status
//!
//! # Database Schema
//!
//! ```sql
//! CREATE TABLE comments (
//!     id BIGSERIAL PRIMARY KEY,
//!     user_id BIGINT NOT NULL,
//!     chapter_id BIGINT NOT NULL,
//!     content TEXT NOT NULL,
//!     is_spoiler BOOLEAN NOT NULL DEFAULT FALSE,
//!     like_count BIGINT NOT NULL DEFAULT 0 CHECK (like_count >= 0),
//!     create_time TIMESTAMPTZ NOT NULL,
//!     update_time TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX comments_user_chapter_key ON comments (user_id, chapter_id);
//!
//! CREATE TABLE reviews (
//!     id BIGSERIAL PRIMARY KEY,
//!     user_id BIGINT NOT NULL,
//!     novel_id BIGINT NOT NULL,
//!     rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
//!     title TEXT NOT NULL,
//!     content TEXT NOT NULL,
//!     is_spoiler BOOLEAN NOT NULL DEFAULT FALSE,
//!     like_count BIGINT NOT NULL DEFAULT 0 CHECK (like_count >= 0),
//!     create_time TIMESTAMPTZ NOT NULL,
//!     update_time TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX reviews_user_novel_key ON reviews (user_id, novel_id);
//!
//! -- Repeat votes are separate rows.
//! CREATE TABLE votes (
//!     id BIGSERIAL PRIMARY KEY,
//!     user_id BIGINT NOT NULL,
//!     novel_id BIGINT NOT NULL,
//!     create_time TIMESTAMPTZ NOT NULL,
//!     update_time TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE reports (
//!     id BIGSERIAL PRIMARY KEY,
//!     reporter_id BIGINT NOT NULL,
//!     content_type TEXT NOT NULL
//!         CHECK (content_type IN ('NOVEL', 'CHAPTER', 'COMMENT', 'REVIEW')),
//!     content_id BIGINT NOT NULL,
//!     reason TEXT NOT NULL,
//!     status TEXT NOT NULL DEFAULT 'IN_REVIEW'
//!         CHECK (status IN ('IN_REVIEW', 'RESOLVED', 'DISMISSED')),
//!     admin_notes TEXT,
//!     resolved_by BIGINT,
//!     create_time TIMESTAMPTZ NOT NULL,
//!     update_time TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX reports_reporter_content_key
//!     ON reports (reporter_id, content_type, content_id);
//! ```
//!
//! [`SCHEMA`] holds the same statements with `IF NOT EXISTS` guards plus the
//! listing indexes; [`PgRecordStore::ensure_schema`] applies it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use engage_store_postgres::PgRecordStore;
//! use sqlx::PgPool;
//!
//! let pool = PgPool::connect("postgres://localhost/engage").await?;
//! let store = Arc::new(PgRecordStore::new(pool));
//! store.ensure_schema().await?;
//!
//! let deps = Deps {
//!     comments: store.clone(),
//!     reviews: store.clone(),
//!     votes: store.clone(),
//!     reports: store.clone(),
//!     ..
//! };
//! ```

mod comment;
mod report;
mod review;
mod vote;

use anyhow::Result;
use engage_core::{Page, PageRequest, UniqueViolation};
use sqlx::PgPool;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Idempotent DDL for every table and index the store uses.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL,
    chapter_id BIGINT NOT NULL,
    content TEXT NOT NULL,
    is_spoiler BOOLEAN NOT NULL DEFAULT FALSE,
    like_count BIGINT NOT NULL DEFAULT 0 CHECK (like_count >= 0),
    create_time TIMESTAMPTZ NOT NULL,
    update_time TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS comments_user_chapter_key ON comments (user_id, chapter_id);
CREATE INDEX IF NOT EXISTS idx_comments_chapter ON comments (chapter_id, create_time DESC);
CREATE INDEX IF NOT EXISTS idx_comments_user ON comments (user_id, create_time DESC);

CREATE TABLE IF NOT EXISTS reviews (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL,
    novel_id BIGINT NOT NULL,
    rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    is_spoiler BOOLEAN NOT NULL DEFAULT FALSE,
    like_count BIGINT NOT NULL DEFAULT 0 CHECK (like_count >= 0),
    create_time TIMESTAMPTZ NOT NULL,
    update_time TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS reviews_user_novel_key ON reviews (user_id, novel_id);
CREATE INDEX IF NOT EXISTS idx_reviews_novel ON reviews (novel_id, create_time DESC);
CREATE INDEX IF NOT EXISTS idx_reviews_user ON reviews (user_id, create_time DESC);

CREATE TABLE IF NOT EXISTS votes (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL,
    novel_id BIGINT NOT NULL,
    create_time TIMESTAMPTZ NOT NULL,
    update_time TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_votes_novel ON votes (novel_id, create_time DESC);
CREATE INDEX IF NOT EXISTS idx_votes_user ON votes (user_id, create_time DESC);

CREATE TABLE IF NOT EXISTS reports (
    id BIGSERIAL PRIMARY KEY,
    reporter_id BIGINT NOT NULL,
    content_type TEXT NOT NULL
        CHECK (content_type IN ('NOVEL', 'CHAPTER', 'COMMENT', 'REVIEW')),
    content_id BIGINT NOT NULL,
    reason TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'IN_REVIEW'
        CHECK (status IN ('IN_REVIEW', 'RESOLVED', 'DISMISSED')),
    admin_notes TEXT,
    resolved_by BIGINT,
    create_time TIMESTAMPTZ NOT NULL,
    update_time TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS reports_reporter_content_key
    ON reports (reporter_id, content_type, content_id);
CREATE INDEX IF NOT EXISTS idx_reports_status ON reports (status, create_time DESC);
"#;

/// PostgreSQL record store for comments, reviews, votes and reports.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables and indexes.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

/// Map an insert failure, turning unique index hits into [`UniqueViolation`].
fn insert_error(e: sqlx::Error) -> anyhow::Error {
    if let Some(db) = e.as_database_error() {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db.constraint().unwrap_or("unknown").to_string();
            return UniqueViolation::new(constraint).into();
        }
    }
    e.into()
}

/// `LIMIT` and `OFFSET` binds for a page request.
fn limit_offset(request: PageRequest) -> (i64, i64) {
    (
        i64::try_from(request.limit()).unwrap_or(i64::MAX),
        i64::try_from(request.offset()).unwrap_or(i64::MAX),
    )
}

fn page_of<T>(items: Vec<T>, total: i64, request: PageRequest) -> Page<T> {
    Page {
        items,
        total: u64::try_from(total).unwrap_or_default(),
        page: request.page,
        size: request.size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_offset_follows_the_request() {
        assert_eq!(limit_offset(PageRequest::new(1, 20)), (20, 0));
        assert_eq!(limit_offset(PageRequest::new(3, 10)), (10, 20));
    }

    #[test]
    fn negative_totals_clamp_to_zero() {
        let page = page_of(vec![1, 2], -1, PageRequest::new(1, 2));
        assert_eq!(page.total, 0);
        assert_eq!(page.items, vec![1, 2]);
    }

    #[test]
    fn non_database_errors_pass_through() {
        let err = insert_error(sqlx::Error::RowNotFound);
        assert!(err.downcast_ref::<UniqueViolation>().is_none());
        assert!(err.downcast_ref::<sqlx::Error>().is_some());
    }

    #[test]
    fn schema_covers_every_table() {
        for table in ["comments", "reviews", "votes", "reports"] {
            assert!(SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
    }
}
