//! Interfaces to the remote collaborators that own content, identity and
//! rewards.
//!
//! The pipeline never assumes these calls succeed. Which failures abort an
//! operation and which only degrade it is decided at each call site.

use crate::record::{ContentType, RecordKind, UserId};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Title and owner of a chapter or novel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub title: String,
    /// Author of the content, when the content service knows it.
    pub owner_id: Option<UserId>,
}

/// Source of truth for chapter and novel existence.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    async fn target_exists(&self, content_type: ContentType, id: i64) -> Result<bool>;

    /// `Ok(None)` means the content does not exist.
    async fn get_target(&self, content_type: ContentType, id: i64) -> Result<Option<TargetInfo>>;
}

/// Resolves user ids to display names. Unknown users are `Ok(None)`.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn display_name(&self, user_id: UserId) -> Result<Option<String>>;
}

/// Answer to a vote eligibility query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Eligibility {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// One credit issued after a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardGrant {
    pub user_id: UserId,
    pub action: RecordKind,
    pub experience: i64,
}

/// Credits experience and gates voting.
#[async_trait]
pub trait RewardGateway: Send + Sync {
    async fn credit(&self, grant: RewardGrant) -> Result<()>;
    async fn check_vote_eligibility(&self, user_id: UserId) -> Result<Eligibility>;
}
