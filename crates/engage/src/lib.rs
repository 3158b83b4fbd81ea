//! # Engage
//!
//! The engagement mutation pipeline: readers comment on chapters, review and
//! vote for novels, and report abusive content. External services own
//! content existence, identity and rewards; this crate owns the records and
//! the orchestration around every write.
//!
//! ## Core Concepts
//!
//! - [`Record`] kinds: [`Comment`], [`Review`], [`Vote`], [`Report`]
//! - [`RecordStore`]: the only authoritative state
//! - Gateways ([`ContentGateway`], [`IdentityGateway`], [`RewardGateway`]):
//!   remote collaborators that may be slow, failing or gone
//! - [`EventPublisher`] and [`Cache`]: best-effort side channels
//! - [`Pipeline`]: composes all of the above per operation
//!
//! ## Key Invariants
//!
//! 1. **No write without validation** - target existence, self-target,
//!    uniqueness and eligibility checks all run before the insert
//! 2. **One operation = one store write** - the caller's transaction wraps
//!    exactly that write; gateways sit outside it
//! 3. **The write is the outcome** - reward, event, cache and enrichment
//!    failures are logged and never reach the caller
//! 4. **No state between calls** - every collaborator is injected
//!
//! ## Guarantees
//!
//! - **At-most-once side effects**: no retries, no outbox, no compensation
//! - **Delete is physical**: rewards and events of a deleted record stand
//! - **Uniqueness is read-then-insert**: stores that enforce it themselves
//!   report [`UniqueViolation`], surfaced as [`EngageError::DuplicateRecord`]
//!
//! ## Example
//!
//! ```ignore
//! use engage_core::{Actor, CommentInput, Deps, PipelineBuilder, PipelineConfig};
//!
//! let pipeline = PipelineBuilder::new(deps)
//!     .with_config(PipelineConfig::default())
//!     .build();
//!
//! let reader = Actor::reader(42);
//! let view = pipeline
//!     .create_comment(&reader, 7, CommentInput {
//!         content: "nice chapter".into(),
//!         is_spoiler: false,
//!     })
//!     .await?;
//! assert!(view.is_own_comment);
//! ```

mod bus;
mod cache;
mod config;
mod error;
mod events;
mod gateway;
mod inflight;
mod page;
mod pipeline;
mod record;
mod store;

// Re-export record types
pub use record::{
    Actor, ChapterId, Comment, CommentInput, CommentPatch, ContentType, NewComment, NewReport,
    NewReview, NewVote, NovelId, Record, RecordId, RecordKind, Report, ReportInput,
    ReportResolution, ReportStatus, ReportTarget, Review, ReviewInput, ReviewPatch, Role, UserId,
    Vote,
};

// Re-export error types
pub use error::{EngageError, ErrorCategory, Result, UniqueViolation};

// Re-export collaborator interfaces
pub use gateway::{ContentGateway, Eligibility, IdentityGateway, RewardGateway, RewardGrant, TargetInfo};
pub use store::{RecordStore, ReportStore};

// Re-export event types
pub use bus::{BroadcastPublisher, PublishedEvent};
pub use events::{
    EngagementEvent, EventEnvelope, EventPublisher, NoOpPublisher, COMMENT_CHANNEL,
    REPORT_CHANNEL, REVIEW_CHANNEL, VOTE_CHANNEL,
};

// Re-export cache types
pub use cache::{listing_key, scope_prefix, Cache, MemoryCache, NoOpCache};

// Re-export pipeline types (primary entry point)
pub use config::{PipelineConfig, RewardSchedule};
pub use inflight::InflightTracker;
pub use page::{Page, PageRequest};
pub use pipeline::{CommentView, Deps, Pipeline, PipelineBuilder, ReportView, ReviewView, VoteView};

// Re-export commonly used external types
pub use async_trait::async_trait;
