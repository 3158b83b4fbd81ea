use anyhow::{bail, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use engage_core::{
    Cache, ContentGateway, ContentType, Eligibility, EventPublisher, IdentityGateway,
    PublishedEvent, RewardGateway, RewardGrant, TargetInfo, UserId,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

// ── Content ──

/// Chapters and novels known to the fake content service.
#[derive(Default)]
pub struct FakeContent {
    targets: DashMap<(ContentType, i64), TargetInfo>,
    failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chapter(&self, id: i64, title: &str, author: UserId) {
        self.add(ContentType::Chapter, id, title, Some(author));
    }

    pub fn add_novel(&self, id: i64, title: &str, author: UserId) {
        self.add(ContentType::Novel, id, title, Some(author));
    }

    pub fn add(&self, content_type: ContentType, id: i64, title: &str, owner_id: Option<UserId>) {
        self.targets.insert(
            (content_type, id),
            TargetInfo {
                title: title.to_string(),
                owner_id,
            },
        );
    }

    pub fn remove(&self, content_type: ContentType, id: i64) {
        self.targets.remove(&(content_type, id));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every lookup, to widen race windows in tests.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            bail!("content service unreachable");
        }
        Ok(())
    }
}

#[async_trait]
impl ContentGateway for FakeContent {
    async fn target_exists(&self, content_type: ContentType, id: i64) -> Result<bool> {
        self.enter().await?;
        Ok(self.targets.contains_key(&(content_type, id)))
    }

    async fn get_target(&self, content_type: ContentType, id: i64) -> Result<Option<TargetInfo>> {
        self.enter().await?;
        Ok(self.targets.get(&(content_type, id)).map(|t| t.clone()))
    }
}

// ── Identity ──

#[derive(Default)]
pub struct FakeIdentity {
    names: DashMap<UserId, String>,
    failing: AtomicBool,
    lookups: AtomicUsize,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: UserId, name: &str) {
        self.names.insert(id, name.to_string());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityGateway for FakeIdentity {
    async fn display_name(&self, user_id: UserId) -> Result<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("identity service unreachable");
        }
        Ok(self.names.get(&user_id).map(|n| n.clone()))
    }
}

// ── Rewards ──

pub struct FakeRewards {
    grants: Mutex<Vec<RewardGrant>>,
    eligibility: Mutex<Eligibility>,
    credit_failing: AtomicBool,
    eligibility_failing: AtomicBool,
    eligibility_checks: AtomicUsize,
}

impl Default for FakeRewards {
    fn default() -> Self {
        Self {
            grants: Mutex::new(Vec::new()),
            eligibility: Mutex::new(Eligibility::allowed()),
            credit_failing: AtomicBool::new(false),
            eligibility_failing: AtomicBool::new(false),
            eligibility_checks: AtomicUsize::new(0),
        }
    }
}

impl FakeRewards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_eligibility(&self, eligibility: Eligibility) {
        *self.eligibility.lock().unwrap_or_else(PoisonError::into_inner) = eligibility;
    }

    pub fn set_credit_failing(&self, failing: bool) {
        self.credit_failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_eligibility_failing(&self, failing: bool) {
        self.eligibility_failing.store(failing, Ordering::SeqCst);
    }

    /// Credits that went through.
    pub fn grants(&self) -> Vec<RewardGrant> {
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn eligibility_checks(&self) -> usize {
        self.eligibility_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RewardGateway for FakeRewards {
    async fn credit(&self, grant: RewardGrant) -> Result<()> {
        if self.credit_failing.load(Ordering::SeqCst) {
            bail!("reward service unreachable");
        }
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(grant);
        Ok(())
    }

    async fn check_vote_eligibility(&self, _user_id: UserId) -> Result<Eligibility> {
        self.eligibility_checks.fetch_add(1, Ordering::SeqCst);
        if self.eligibility_failing.load(Ordering::SeqCst) {
            bail!("reward service unreachable");
        }
        Ok(self
            .eligibility
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

// ── Events ──

/// Keeps every published event for assertions.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<PublishedEvent>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedEvent> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn on_channel(&self, channel: &str) -> Vec<PublishedEvent> {
        self.published()
            .into_iter()
            .filter(|e| e.channel == channel)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, channel: &str, key: &str, payload: serde_json::Value) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("broker unreachable");
        }
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PublishedEvent {
                channel: channel.to_string(),
                key: key.to_string(),
                payload,
            });
        Ok(())
    }
}

// ── Cache ──

/// A cache whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>> {
        bail!("cache unreachable")
    }

    async fn set(&self, _key: &str, _value: serde_json::Value, _ttl: Duration) -> Result<()> {
        bail!("cache unreachable")
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        bail!("cache unreachable")
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64> {
        bail!("cache unreachable")
    }
}
