use crate::{insert_error, limit_offset, page_of, PgRecordStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engage_core::{
    NewReview, NovelId, Page, PageRequest, RecordId, RecordStore, Review, ReviewPatch, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::Row;

const COLUMNS: &str = "id, user_id, novel_id, rating, title, content, is_spoiler, like_count, \
                       create_time, update_time";

fn from_row(row: &PgRow) -> Result<Review> {
    Ok(Review {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        novel_id: row.try_get("novel_id")?,
        rating: row.try_get("rating")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        is_spoiler: row.try_get("is_spoiler")?,
        like_count: row.try_get("like_count")?,
        create_time: row.try_get("create_time")?,
        update_time: row.try_get("update_time")?,
    })
}

#[async_trait]
impl RecordStore<Review> for PgRecordStore {
    async fn insert(&self, draft: &NewReview) -> Result<RecordId> {
        let row = sqlx::query(
            r#"
            INSERT INTO reviews
                (user_id, novel_id, rating, title, content, is_spoiler, create_time, update_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id
            "#,
        )
        .bind(draft.user_id)
        .bind(draft.novel_id)
        .bind(draft.rating)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.is_spoiler)
        .bind(draft.create_time)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(row.try_get("id")?)
    }

    async fn update_fields(
        &self,
        id: RecordId,
        changes: &ReviewPatch,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                is_spoiler = COALESCE($5, is_spoiler),
                update_time = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.rating)
        .bind(changes.title.as_deref())
        .bind(changes.content.as_deref())
        .bind(changes.is_spoiler)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: RecordId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn increment_counter(&self, id: RecordId, delta: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE reviews SET like_count = GREATEST(like_count + $2, 0) WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn find(&self, id: RecordId) -> Result<Option<Review>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    async fn find_by_owner_and_target(
        &self,
        owner: UserId,
        novel_id: &NovelId,
    ) -> Result<Option<Review>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM reviews WHERE user_id = $1 AND novel_id = $2"
        ))
        .bind(owner)
        .bind(*novel_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(from_row).transpose()
    }

    async fn list_by_target(&self, novel_id: &NovelId, page: PageRequest) -> Result<Page<Review>> {
        self.list_reviews_where("novel_id", *novel_id, page).await
    }

    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Page<Review>> {
        self.list_reviews_where("user_id", owner, page).await
    }
}

impl PgRecordStore {
    async fn list_reviews_where(
        &self,
        column: &'static str,
        value: i64,
        request: PageRequest,
    ) -> Result<Page<Review>> {
        let (limit, offset) = limit_offset(request);
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM reviews WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM reviews
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
