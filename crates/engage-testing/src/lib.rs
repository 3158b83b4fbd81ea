//! Testing utilities for the engagement pipeline.
//!
//! Every collaborator has an in-memory stand-in with counters and failure
//! switches. [`TestHarness`] wires one of each into a [`Pipeline`].
//!
//! ```ignore
//! let h = TestHarness::new();
//! h.content.add_chapter(7, "Chapter 7", 99);
//! let pipeline = h.pipeline();
//!
//! pipeline.create_comment(&Actor::reader(1), 7, input).await?;
//! pipeline.settle().await;
//! assert_eq!(h.events.published().len(), 1);
//! ```

mod gateways;
mod store;

pub use gateways::{FailingCache, FakeContent, FakeIdentity, FakeRewards, RecordingPublisher};
pub use store::MemoryStore;

use engage_core::{
    Comment, Deps, MemoryCache, Pipeline, PipelineBuilder, PipelineConfig, Report, Review, Vote,
};
use std::sync::Arc;

/// One fake per collaborator, shared with the pipeline it builds.
#[derive(Clone)]
pub struct TestHarness {
    pub comments: Arc<MemoryStore<Comment>>,
    pub reviews: Arc<MemoryStore<Review>>,
    pub votes: Arc<MemoryStore<Vote>>,
    pub reports: Arc<MemoryStore<Report>>,
    pub content: Arc<FakeContent>,
    pub identity: Arc<FakeIdentity>,
    pub rewards: Arc<FakeRewards>,
    pub events: Arc<RecordingPublisher>,
    pub cache: Arc<MemoryCache>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::from_stores(
            MemoryStore::new(),
            MemoryStore::new(),
            MemoryStore::new(),
            MemoryStore::new(),
        )
    }

    /// Stores that enforce uniqueness themselves, like a unique index.
    pub fn with_unique_indexes() -> Self {
        Self::from_stores(
            MemoryStore::with_unique_index(),
            MemoryStore::with_unique_index(),
            MemoryStore::with_unique_index(),
            MemoryStore::with_unique_index(),
        )
    }

    fn from_stores(
        comments: MemoryStore<Comment>,
        reviews: MemoryStore<Review>,
        votes: MemoryStore<Vote>,
        reports: MemoryStore<Report>,
    ) -> Self {
        Self {
            comments: Arc::new(comments),
            reviews: Arc::new(reviews),
            votes: Arc::new(votes),
            reports: Arc::new(reports),
            content: Arc::new(FakeContent::new()),
            identity: Arc::new(FakeIdentity::new()),
            rewards: Arc::new(FakeRewards::new()),
            events: Arc::new(RecordingPublisher::new()),
            cache: Arc::new(MemoryCache::new()),
        }
    }

    pub fn deps(&self) -> Deps {
        Deps {
            comments: self.comments.clone(),
            reviews: self.reviews.clone(),
            votes: self.votes.clone(),
            reports: self.reports.clone(),
            content: self.content.clone(),
            identity: self.identity.clone(),
            rewards: self.rewards.clone(),
            events: self.events.clone(),
            cache: self.cache.clone(),
        }
    }

    pub fn builder(&self) -> PipelineBuilder {
        PipelineBuilder::new(self.deps())
    }

    pub fn pipeline(&self) -> Pipeline {
        self.builder().build()
    }

    pub fn pipeline_with(&self, config: PipelineConfig) -> Pipeline {
        self.builder().with_config(config).build()
    }
}
