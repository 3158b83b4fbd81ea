use crate::page::{Page, PageRequest};
use crate::record::{Record, RecordId, Report, ReportStatus, UserId};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable keyed storage for one record kind.
///
/// Each method is a single store call; the caller's local transaction wraps
/// exactly one write. Implementations that enforce uniqueness themselves
/// should fail `insert` with [`crate::UniqueViolation`].
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    // ── Writes ──

    /// Insert a new row and return the identity the store assigned.
    async fn insert(&self, draft: &R::Draft) -> Result<RecordId>;

    /// Write the given changes and bump `update_time`. Returns rows affected.
    async fn update_fields(&self, id: RecordId, changes: &R::Changes, now: DateTime<Utc>)
        -> Result<u64>;

    /// Physically remove a row. Returns rows affected.
    async fn delete(&self, id: RecordId) -> Result<u64>;

    /// Atomically add `delta` to the like counter, never below zero.
    /// Returns rows affected; kinds without a counter affect nothing.
    async fn increment_counter(&self, id: RecordId, delta: i64) -> Result<u64>;

    // ── Reads ──

    async fn find(&self, id: RecordId) -> Result<Option<R>>;
    async fn find_by_owner_and_target(&self, owner: UserId, target: &R::Target)
        -> Result<Option<R>>;

    /// Newest first.
    async fn list_by_target(&self, target: &R::Target, page: PageRequest) -> Result<Page<R>>;

    /// Newest first.
    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Page<R>>;
}

/// Report storage plus the admin review queue.
#[async_trait]
pub trait ReportStore: RecordStore<Report> {
    /// Newest first; `None` lists every status.
    async fn list_by_status(
        &self,
        status: Option<ReportStatus>,
        page: PageRequest,
    ) -> Result<Page<Report>>;
}
