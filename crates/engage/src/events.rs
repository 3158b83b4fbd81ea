//! Domain events emitted after a create commits.
//!
//! Events are facts: they describe a row that already exists. Publication is
//! at-most-once; a publisher failure is logged and the event is gone.

use crate::record::{ChapterId, ContentType, NovelId, RecordId, UserId};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const COMMENT_CHANNEL: &str = "engagement.comment.created";
pub const REVIEW_CHANNEL: &str = "engagement.review.created";
pub const VOTE_CHANNEL: &str = "engagement.vote.cast";
pub const REPORT_CHANNEL: &str = "engagement.report.filed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngagementEvent {
    #[serde(rename_all = "camelCase")]
    CommentCreated {
        comment_id: RecordId,
        user_id: UserId,
        chapter_id: ChapterId,
        is_spoiler: bool,
    },
    #[serde(rename_all = "camelCase")]
    ReviewCreated {
        review_id: RecordId,
        user_id: UserId,
        novel_id: NovelId,
        rating: i16,
    },
    #[serde(rename_all = "camelCase")]
    VoteCast {
        vote_id: RecordId,
        user_id: UserId,
        novel_id: NovelId,
    },
    #[serde(rename_all = "camelCase")]
    ReportFiled {
        report_id: RecordId,
        reporter_id: UserId,
        content_type: ContentType,
        content_id: i64,
        reason: String,
    },
}

impl EngagementEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            EngagementEvent::CommentCreated { .. } => COMMENT_CHANNEL,
            EngagementEvent::ReviewCreated { .. } => REVIEW_CHANNEL,
            EngagementEvent::VoteCast { .. } => VOTE_CHANNEL,
            EngagementEvent::ReportFiled { .. } => REPORT_CHANNEL,
        }
    }

    /// Partition key: the id of the record the event describes.
    pub fn record_id(&self) -> RecordId {
        match self {
            EngagementEvent::CommentCreated { comment_id, .. } => *comment_id,
            EngagementEvent::ReviewCreated { review_id, .. } => *review_id,
            EngagementEvent::VoteCast { vote_id, .. } => *vote_id,
            EngagementEvent::ReportFiled { report_id, .. } => *report_id,
        }
    }
}

/// Wire payload. `event_id` lets consumers drop redeliveries from the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub event: EngagementEvent,
}

impl EventEnvelope {
    pub fn new(event: EngagementEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event,
        }
    }
}

/// Emits a payload onto a named channel, keyed by record id.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, key: &str, payload: serde_json::Value) -> Result<()>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPublisher;

#[async_trait]
impl EventPublisher for NoOpPublisher {
    async fn publish(&self, _channel: &str, _key: &str, _payload: serde_json::Value) -> Result<()> {
        Ok(())
    }
}
