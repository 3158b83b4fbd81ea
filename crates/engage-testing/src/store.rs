use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engage_core::{
    Page, PageRequest, Record, RecordId, RecordStore, Report, ReportStatus, ReportStore,
    UniqueViolation, UserId,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory [`RecordStore`] with write counters and a failure switch.
///
/// By default uniqueness is left to the pipeline, like a store without a
/// unique index. [`MemoryStore::with_unique_index`] makes inserts reject a
/// second row per (owner, target) with [`UniqueViolation`].
pub struct MemoryStore<R: Record> {
    rows: Mutex<BTreeMap<RecordId, R>>,
    next_id: AtomicI64,
    unique_index: bool,
    failing: AtomicBool,
    inserts: AtomicUsize,
    writes: AtomicUsize,
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            unique_index: false,
            failing: AtomicBool::new(false),
            inserts: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with_unique_index() -> Self {
        Self {
            unique_index: R::UNIQUE_PER_TARGET,
            ..Self::new()
        }
    }

    /// Every subsequent call fails until switched back off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful inserts.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Successful inserts, updates, deletes and counter changes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<R> {
        self.rows().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<R> {
        self.rows().values().cloned().collect()
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<RecordId, R>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("memory store configured to fail");
        }
        Ok(())
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn newest_first(&self, keep: impl Fn(&R) -> bool, page: PageRequest) -> Page<R> {
        let mut matching: Vec<R> = self.rows().values().filter(|r| keep(r)).cloned().collect();
        matching.sort_by(|a, b| {
            b.create_time()
                .cmp(&a.create_time())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Page::from_sorted(matching, page)
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn insert(&self, draft: &R::Draft) -> Result<RecordId> {
        self.check()?;
        let mut rows = self.rows();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = R::materialize(id, draft.clone());
        if self.unique_index
            && rows
                .values()
                .any(|r| r.owner() == record.owner() && r.target() == record.target())
        {
            return Err(UniqueViolation::new(format!("{}_owner_target_key", R::KIND)).into());
        }
        rows.insert(id, record);
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.wrote();
        Ok(id)
    }

    async fn update_fields(
        &self,
        id: RecordId,
        changes: &R::Changes,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.check()?;
        let mut rows = self.rows();
        let Some(record) = rows.get_mut(&id) else {
            return Ok(0);
        };
        record.apply(changes, now);
        self.wrote();
        Ok(1)
    }

    async fn delete(&self, id: RecordId) -> Result<u64> {
        self.check()?;
        if self.rows().remove(&id).is_none() {
            return Ok(0);
        }
        self.wrote();
        Ok(1)
    }

    async fn increment_counter(&self, id: RecordId, delta: i64) -> Result<u64> {
        self.check()?;
        let mut rows = self.rows();
        let Some(record) = rows.get_mut(&id) else {
            return Ok(0);
        };
        if !record.adjust_likes(delta) {
            return Ok(0);
        }
        self.wrote();
        Ok(1)
    }

    async fn find(&self, id: RecordId) -> Result<Option<R>> {
        self.check()?;
        Ok(self.get(id))
    }

    async fn find_by_owner_and_target(
        &self,
        owner: UserId,
        target: &R::Target,
    ) -> Result<Option<R>> {
        self.check()?;
        Ok(self
            .rows()
            .values()
            .find(|r| r.owner() == owner && &r.target() == target)
            .cloned())
    }

    async fn list_by_target(&self, target: &R::Target, page: PageRequest) -> Result<Page<R>> {
        self.check()?;
        Ok(self.newest_first(|r| &r.target() == target, page))
    }

    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Page<R>> {
        self.check()?;
        Ok(self.newest_first(|r| r.owner() == owner, page))
    }
}

#[async_trait]
impl ReportStore for MemoryStore<Report> {
    async fn list_by_status(
        &self,
        status: Option<ReportStatus>,
        page: PageRequest,
    ) -> Result<Page<Report>> {
        self.check()?;
        Ok(self.newest_first(|r| status.map_or(true, |s| r.status == s), page))
    }
}
