use crate::{insert_error, limit_offset, page_of, PgRecordStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engage_core::{
    ContentType, NewReport, Page, PageRequest, RecordId, RecordStore, Report, ReportResolution,
    ReportStatus, ReportStore, ReportTarget, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::Row;

const COLUMNS: &str = "id, reporter_id, content_type, content_id, reason, status, admin_notes, \
                       resolved_by, create_time, update_time";

fn from_row(row: &PgRow) -> Result<Report> {
    let content_type: String = row.try_get("content_type")?;
    let status: String = row.try_get("status")?;
    Ok(Report {
        id: row.try_get("id")?,
        reporter_id: row.try_get("reporter_id")?,
        content_type: content_type.parse::<ContentType>().map_err(anyhow::Error::msg)?,
        content_id: row.try_get("content_id")?,
        reason: row.try_get("reason")?,
        status: status.parse::<ReportStatus>().map_err(anyhow::Error::msg)?,
        admin_notes: row.try_get("admin_notes")?,
        resolved_by: row.try_get("resolved_by")?,
        create_time: row.try_get("create_time")?,
        update_time: row.try_get("update_time")?,
    })
}

#[async_trait]
impl RecordStore<Report> for PgRecordStore {
    async fn insert(&self, draft: &NewReport) -> Result<RecordId> {
        let row = sqlx::query(
            r#"
            INSERT INTO reports
                (reporter_id, content_type, content_id, reason, status, create_time, update_time)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(draft.reporter_id)
        .bind(draft.content_type.as_str())
        .bind(draft.content_id)
        .bind(&draft.reason)
        .bind(ReportStatus::InReview.as_str())
        .bind(draft.create_time)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(row.try_get("id")?)
    }

    /// Overwrites status, notes and resolver whatever the current status is.
    async fn update_fields(
        &self,
        id: RecordId,
        changes: &ReportResolution,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = $2,
                admin_notes = $3,
                resolved_by = $4,
                update_time = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.status.as_str())
        .bind(changes.admin_notes.as_deref())
        .bind(changes.resolved_by)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: RecordId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn increment_counter(&self, _id: RecordId, _delta: i64) -> Result<u64> {
        Ok(0)
    }

    async fn find(&self, id: RecordId) -> Result<Option<Report>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM reports WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    async fn find_by_owner_and_target(
        &self,
        owner: UserId,
        target: &ReportTarget,
    ) -> Result<Option<Report>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM reports
            WHERE reporter_id = $1 AND content_type = $2 AND content_id = $3
            "#
        ))
        .bind(owner)
        .bind(target.content_type.as_str())
        .bind(target.content_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(from_row).transpose()
    }

    async fn list_by_target(
        &self,
        target: &ReportTarget,
        request: PageRequest,
    ) -> Result<Page<Report>> {
        let (limit, offset) = limit_offset(request);
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports WHERE content_type = $1 AND content_id = $2",
        )
        .bind(target.content_type.as_str())
        .bind(target.content_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM reports
            WHERE content_type = $1 AND content_id = $2
            ORDER BY create_time DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(target.content_type.as_str())
        .bind(target.content_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
        Ok(page_of(items, total, request))
    }

    async fn list_by_owner(&self, owner: UserId, request: PageRequest) -> Result<Page<Report>> {
        let (limit, offset) = limit_offset(request);
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE reporter_id = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM reports
            WHERE reporter_id = $1
            ORDER BY create_time DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
        Ok(page_of(items, total, request))
    }
}

#[async_trait]
impl ReportStore for PgRecordStore {
    async fn list_by_status(
        &self,
        status: Option<ReportStatus>,
        request: PageRequest,
    ) -> Result<Page<Report>> {
        let status = status.map(ReportStatus::as_str);
        let (limit, offset) = limit_offset(request);
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM reports
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY create_time DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
        Ok(page_of(items, total, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_labels_parse_back() {
        for status in [
            ReportStatus::InReview,
            ReportStatus::Resolved,
            ReportStatus::Dismissed,
        ] {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
        }
        for content_type in [
            ContentType::Novel,
            ContentType::Chapter,
            ContentType::Comment,
            ContentType::Review,
        ] {
            assert_eq!(
                content_type.as_str().parse::<ContentType>().unwrap(),
                content_type
            );
        }
    }
}
