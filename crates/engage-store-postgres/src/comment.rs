use crate::{insert_error, limit_offset, page_of, PgRecordStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engage_core::{
    ChapterId, Comment, CommentPatch, NewComment, Page, PageRequest, RecordId, RecordStore, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::Row;

const COLUMNS: &str =
    "id, user_id, chapter_id, content, is_spoiler, like_count, create_time, update_time";

fn from_row(row: &PgRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        chapter_id: row.try_get("chapter_id")?,
        content: row.try_get("content")?,
        is_spoiler: row.try_get("is_spoiler")?,
        like_count: row.try_get("like_count")?,
        create_time: row.try_get("create_time")?,
        update_time: row.try_get("update_time")?,
    })
}

#[async_trait]
impl RecordStore<Comment> for PgRecordStore {
    async fn insert(&self, draft: &NewComment) -> Result<RecordId> {
        let row = sqlx::query(
            r#"
            INSERT INTO comments (user_id, chapter_id, content, is_spoiler, create_time, update_time)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(draft.user_id)
        .bind(draft.chapter_id)
        .bind(&draft.content)
        .bind(draft.is_spoiler)
        .bind(draft.create_time)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(row.try_get("id")?)
    }

    /// Absent patch fields keep their column value.
    async fn update_fields(
        &self,
        id: RecordId,
        changes: &CommentPatch,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE comments
            SET content = COALESCE($2, content),
                is_spoiler = COALESCE($3, is_spoiler),
                update_time = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.content.as_deref())
        .bind(changes.is_spoiler)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: RecordId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn increment_counter(&self, id: RecordId, delta: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE comments SET like_count = GREATEST(like_count + $2, 0) WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn find(&self, id: RecordId) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM comments WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    async fn find_by_owner_and_target(
        &self,
        owner: UserId,
        chapter_id: &ChapterId,
    ) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM comments WHERE user_id = $1 AND chapter_id = $2"
        ))
        .bind(owner)
        .bind(*chapter_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(from_row).transpose()
    }

    async fn list_by_target(
        &self,
        chapter_id: &ChapterId,
        page: PageRequest,
    ) -> Result<Page<Comment>> {
        self.list_comments_where("chapter_id", *chapter_id, page).await
    }

    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Page<Comment>> {
        self.list_comments_where("user_id", owner, page).await
    }
}

impl PgRecordStore {
    /// `column` is one of our own column names, never caller input.
    async fn list_comments_where(
        &self,
        column: &'static str,
        value: i64,
        request: PageRequest,
    ) -> Result<Page<Comment>> {
        let (limit, offset) = limit_offset(request);
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM comments WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM comments
            WHERE {column} = $1
            ORDER BY create_time DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(value)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
        Ok(page_of(items, total, request))
    }
}
