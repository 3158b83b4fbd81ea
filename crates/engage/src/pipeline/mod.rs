//! The mutation pipeline.
//!
//! Every create runs the same sequence:
//!
//! ```text
//! validate input
//!     │
//!     ▼
//! content gateway ──► self-target guard ──► uniqueness ──► eligibility
//!     │  (mandatory: any failure aborts before a write)
//!     ▼
//! record store insert  ◄── the only authoritative write
//!     │
//!     ├─► reward credit      (detached, logged)
//!     ├─► event publication  (detached, logged)
//!     ├─► cache invalidation (awaited, errors swallowed)
//!     ▼
//! enrichment (placeholders on failure) ──► view
//! ```
//!
//! Once the insert commits the operation has succeeded. Nothing after it can
//! turn the result into an error, and nothing after it is retried.

mod comments;
mod enrich;
mod reports;
mod reviews;
mod votes;

pub use enrich::{CommentView, ReportView, ReviewView, VoteView};

use crate::cache::{listing_key, scope_prefix, Cache, NoOpCache};
use crate::config::PipelineConfig;
use crate::error::{EngageError, Result};
use crate::events::{EngagementEvent, EventEnvelope, EventPublisher, NoOpPublisher};
use crate::gateway::{ContentGateway, IdentityGateway, RewardGateway, RewardGrant, TargetInfo};
use crate::inflight::InflightTracker;
use crate::page::{Page, PageRequest};
use crate::record::{
    Actor, Comment, ContentType, Record, RecordId, RecordKind, Review, UserId, Vote,
};
use crate::store::{RecordStore, ReportStore};
use enrich::Enricher;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Injected collaborators. All shared state lives behind these.
#[derive(Clone)]
pub struct Deps {
    pub comments: Arc<dyn RecordStore<Comment>>,
    pub reviews: Arc<dyn RecordStore<Review>>,
    pub votes: Arc<dyn RecordStore<Vote>>,
    pub reports: Arc<dyn ReportStore>,
    pub content: Arc<dyn ContentGateway>,
    pub identity: Arc<dyn IdentityGateway>,
    pub rewards: Arc<dyn RewardGateway>,
    pub events: Arc<dyn EventPublisher>,
    pub cache: Arc<dyn Cache>,
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    deps: Deps,
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new(deps: Deps) -> Self {
        Self {
            deps,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.deps.events = events;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.deps.cache = cache;
        self
    }

    /// Drop event publication and caching entirely.
    pub fn without_side_channels(self) -> Self {
        self.with_events(Arc::new(NoOpPublisher))
            .with_cache(Arc::new(NoOpCache))
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            deps: self.deps,
            config: Arc::new(self.config),
            inflight: InflightTracker::new(),
        }
    }
}

/// Orchestrates create/update/delete/list/moderate for all record kinds.
///
/// Holds no record state between calls; cloning is cheap and clones share
/// the same collaborators.
#[derive(Clone)]
pub struct Pipeline {
    deps: Deps,
    config: Arc<PipelineConfig>,
    inflight: InflightTracker,
}

impl Pipeline {
    pub fn builder(deps: Deps) -> PipelineBuilder {
        PipelineBuilder::new(deps)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Wait for detached reward and event tasks. Operations never call this.
    pub async fn settle(&self) {
        self.inflight.settle().await;
    }

    pub fn inflight(&self) -> usize {
        self.inflight.inflight()
    }

    fn enricher(&self) -> Enricher<'_> {
        Enricher::new(&self.deps, &self.config)
    }

    fn page(&self, request: PageRequest) -> PageRequest {
        request.normalized(self.config.default_page_size, self.config.max_page_size)
    }

    // ── Mandatory pre-write checks ──

    async fn require_target_exists(&self, content_type: ContentType, id: i64) -> Result<()> {
        let exists = self
            .deps
            .content
            .target_exists(content_type, id)
            .await
            .map_err(|e| EngageError::unavailable("content gateway", e))?;
        if !exists {
            return Err(EngageError::not_found(format!("{} {id}", content_type.label())));
        }
        Ok(())
    }

    async fn require_target(&self, content_type: ContentType, id: i64) -> Result<TargetInfo> {
        self.deps
            .content
            .get_target(content_type, id)
            .await
            .map_err(|e| EngageError::unavailable("content gateway", e))?
            .ok_or_else(|| EngageError::not_found(format!("{} {id}", content_type.label())))
    }

    async fn reject_duplicate<R, S>(
        &self,
        store: &S,
        owner: UserId,
        target: &R::Target,
        message: &str,
    ) -> Result<()>
    where
        R: Record,
        S: RecordStore<R> + ?Sized,
    {
        if store
            .find_by_owner_and_target(owner, target)
            .await
            .map_err(store_unavailable)?
            .is_some()
        {
            return Err(EngageError::duplicate(message));
        }
        Ok(())
    }

    // ── The write ──

    async fn insert<R, S>(&self, store: &S, draft: R::Draft, duplicate_msg: &str) -> Result<R>
    where
        R: Record,
        S: RecordStore<R> + ?Sized,
    {
        let id = store
            .insert(&draft)
            .await
            .map_err(|e| EngageError::from_store(e, duplicate_msg))?;
        Ok(R::materialize(id, draft))
    }

    // ── Post-commit side effects ──

    fn grant(&self, user_id: UserId, action: RecordKind, experience: i64) -> Option<RewardGrant> {
        (experience > 0).then_some(RewardGrant {
            user_id,
            action,
            experience,
        })
    }

    /// Steps after the commit. Each is independent; none can fail the call.
    async fn after_create(&self, grant: Option<RewardGrant>, event: EngagementEvent, scope: String) {
        if let Some(grant) = grant {
            self.credit_detached(grant);
        }
        self.publish_detached(event);
        self.invalidate_scope(&scope).await;
    }

    fn credit_detached(&self, grant: RewardGrant) {
        let rewards = self.deps.rewards.clone();
        self.inflight.spawn(async move {
            let user_id = grant.user_id;
            let action = grant.action;
            match rewards.credit(grant).await {
                Ok(()) => debug!(user_id, %action, "reward credited"),
                Err(e) => warn!(user_id, %action, error = %e, "reward credit failed"),
            }
        });
    }

    fn publish_detached(&self, event: EngagementEvent) {
        let channel = event.channel();
        let key = event.record_id().to_string();
        let payload = match serde_json::to_value(EventEnvelope::new(event)) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(channel, key = %key, error = %e, "event not serializable, dropped");
                return;
            }
        };
        let events = self.deps.events.clone();
        self.inflight.spawn(async move {
            match events.publish(channel, &key, payload).await {
                Ok(()) => debug!(channel, key = %key, "event published"),
                Err(e) => warn!(channel, key = %key, error = %e, "event publication failed"),
            }
        });
    }

    async fn invalidate_scope(&self, scope: &str) {
        match self.deps.cache.delete_prefix(&scope_prefix(scope)).await {
            Ok(removed) => debug!(scope, removed, "listing cache invalidated"),
            Err(e) => warn!(scope, error = %e, "listing cache invalidation failed"),
        }
    }

    // ── Shared read paths ──

    /// Read-through listing by target. Cache trouble degrades to a store read.
    async fn cached_list<R, S>(
        &self,
        store: &S,
        target: &R::Target,
        request: PageRequest,
    ) -> Result<Page<R>>
    where
        R: Record,
        S: RecordStore<R> + ?Sized,
    {
        let key = listing_key(&R::scope(target), request);
        match self.deps.cache.get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<Page<R>>(value) {
                Ok(page) => {
                    debug!(key = %key, "listing cache hit");
                    return Ok(page);
                }
                Err(e) => warn!(key = %key, error = %e, "undecodable cache entry, ignoring"),
            },
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "listing cache read failed"),
        }

        let page = store
            .list_by_target(target, request)
            .await
            .map_err(store_unavailable)?;

        match serde_json::to_value(&page) {
            Ok(value) => {
                if let Err(e) = self
                    .deps
                    .cache
                    .set(&key, value, self.config.listing_cache_ttl)
                    .await
                {
                    warn!(key = %key, error = %e, "listing cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "listing not serializable, not cached"),
        }
        Ok(page)
    }

    // ── Shared mutations ──

    async fn delete_record<R, S>(&self, store: &S, actor: &Actor, id: RecordId) -> Result<bool>
    where
        R: Record,
        S: RecordStore<R> + ?Sized,
    {
        let record: R = load(store, id).await?;
        if record.owner() != actor.id && !actor.is_admin() {
            return Err(EngageError::forbidden(format!(
                "You can only delete your own {}",
                R::KIND.label().to_lowercase()
            )));
        }
        let affected = store.delete(id).await.map_err(store_unavailable)?;
        info!(kind = R::KIND.label(), id, actor = actor.id, admin = actor.is_admin(), "record deleted");
        Ok(affected > 0)
    }

    /// Sequential, not atomic: a failure partway leaves earlier deletes in place.
    async fn batch_delete<R, S>(&self, store: &S, actor: &Actor, ids: &[RecordId]) -> Result<usize>
    where
        R: Record,
        S: RecordStore<R> + ?Sized,
    {
        require_admin(actor, "batch delete")?;
        let mut deleted = 0;
        for &id in ids {
            if store.find(id).await.map_err(store_unavailable)?.is_none() {
                debug!(kind = R::KIND.label(), id, "batch delete skipped missing record");
                continue;
            }
            if store.delete(id).await.map_err(store_unavailable)? > 0 {
                deleted += 1;
            }
        }
        info!(kind = R::KIND.label(), requested = ids.len(), deleted, admin = actor.id, "batch delete");
        Ok(deleted)
    }

    /// Load each id and write whatever `changes_for` asks for. Missing ids
    /// and records needing no change are skipped; returns how many changed.
    async fn bulk_update<R, S, F>(
        &self,
        store: &S,
        actor: &Actor,
        ids: &[RecordId],
        changes_for: F,
    ) -> Result<usize>
    where
        R: Record,
        S: RecordStore<R> + ?Sized,
        F: Fn(&R) -> Option<R::Changes>,
    {
        require_admin(actor, "bulk update")?;
        let mut updated = 0;
        for &id in ids {
            let Some(record) = store.find(id).await.map_err(store_unavailable)? else {
                continue;
            };
            let Some(changes) = changes_for(&record) else {
                continue;
            };
            let now = chrono::Utc::now();
            if store
                .update_fields(id, &changes, now)
                .await
                .map_err(store_unavailable)?
                > 0
            {
                updated += 1;
            }
        }
        info!(kind = R::KIND.label(), requested = ids.len(), updated, admin = actor.id, "bulk update");
        Ok(updated)
    }

    async fn toggle_counter<R, S>(&self, store: &S, id: RecordId, increasing: bool) -> Result<()>
    where
        R: Record,
        S: RecordStore<R> + ?Sized,
    {
        let delta = if increasing { 1 } else { -1 };
        let affected = store
            .increment_counter(id, delta)
            .await
            .map_err(store_unavailable)?;
        if affected == 0 {
            return Err(EngageError::not_found(format!("{} {id}", R::KIND)));
        }
        debug!(kind = R::KIND.label(), id, delta, "like counter adjusted");
        Ok(())
    }
}

async fn load<R, S>(store: &S, id: RecordId) -> Result<R>
where
    R: Record,
    S: RecordStore<R> + ?Sized,
{
    store
        .find(id)
        .await
        .map_err(store_unavailable)?
        .ok_or_else(|| EngageError::not_found(format!("{} {id}", R::KIND)))
}

fn ensure_owner<R: Record>(record: &R, actor: &Actor) -> Result<()> {
    if record.owner() != actor.id {
        return Err(EngageError::forbidden(format!(
            "You can only edit your own {}",
            R::KIND.label().to_lowercase()
        )));
    }
    Ok(())
}

fn require_admin(actor: &Actor, what: &str) -> Result<()> {
    if !actor.is_admin() {
        return Err(EngageError::forbidden(format!("{what} requires an admin")));
    }
    Ok(())
}

fn store_unavailable(e: anyhow::Error) -> EngageError {
    EngageError::unavailable("record store", e)
}

/// Trim and bound a required text field.
fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngageError::validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(EngageError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}
