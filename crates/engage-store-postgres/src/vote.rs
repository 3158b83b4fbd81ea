use crate::{insert_error, limit_offset, page_of, PgRecordStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engage_core::{NewVote, NovelId, Page, PageRequest, RecordId, RecordStore, UserId, Vote};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::convert::Infallible;

const COLUMNS: &str = "id, user_id, novel_id, create_time, update_time";

fn from_row(row: &PgRow) -> Result<Vote> {
    Ok(Vote {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        novel_id: row.try_get("novel_id")?,
        create_time: row.try_get("create_time")?,
        update_time: row.try_get("update_time")?,
    })
}

/// Votes are immutable and carry no counter.
#[async_trait]
impl RecordStore<Vote> for PgRecordStore {
    async fn insert(&self, draft: &NewVote) -> Result<RecordId> {
        let row = sqlx::query(
            r#"
            INSERT INTO votes (user_id, novel_id, create_time, update_time)
            VALUES ($1, $2, $3, $3)
            RETURNING id
            "#,
        )
        .bind(draft.user_id)
        .bind(draft.novel_id)
        .bind(draft.create_time)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(row.try_get("id")?)
    }

    async fn update_fields(
        &self,
        _id: RecordId,
        changes: &Infallible,
        _now: DateTime<Utc>,
    ) -> Result<u64> {
        match *changes {}
    }

    async fn delete(&self, id: RecordId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM votes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn increment_counter(&self, _id: RecordId, _delta: i64) -> Result<u64> {
        Ok(0)
    }

    async fn find(&self, id: RecordId) -> Result<Option<Vote>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM votes WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    /// The most recent vote, if any.
    async fn find_by_owner_and_target(
        &self,
        owner: UserId,
        novel_id: &NovelId,
    ) -> Result<Option<Vote>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM votes
            WHERE user_id = $1 AND novel_id = $2
            ORDER BY create_time DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(owner)
        .bind(*novel_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(from_row).transpose()
    }

    async fn list_by_target(&self, novel_id: &NovelId, page: PageRequest) -> Result<Page<Vote>> {
        self.list_votes_where("novel_id", *novel_id, page).await
    }

    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Page<Vote>> {
        self.list_votes_where("user_id", owner, page).await
    }
}

impl PgRecordStore {
    async fn list_votes_where(
        &self,
        column: &'static str,
        value: i64,
        request: PageRequest,
    ) -> Result<Page<Vote>> {
        let (limit, offset) = limit_offset(request);
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM votes WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM votes
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
