//! Response hydration.
//!
//! Enrichment is cosmetic: every lookup that fails or comes back empty turns
//! into a placeholder string and a `warn!`, never an error.

use super::Deps;
use crate::config::PipelineConfig;
use crate::record::{Comment, ContentType, Report, Review, UserId, Vote};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

const EXCERPT_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user_name: String,
    pub chapter_title: String,
    pub is_own_comment: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub user_name: String,
    pub novel_title: String,
    pub is_own_review: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
    #[serde(flatten)]
    pub vote: Vote,
    pub user_name: String,
    pub novel_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub reporter_name: String,
    pub content_title: String,
    pub resolver_name: Option<String>,
}

/// Per-call memo of names and titles. Dropped when the call returns.
pub(super) struct Enricher<'a> {
    deps: &'a Deps,
    config: &'a PipelineConfig,
    names: HashMap<UserId, String>,
    titles: HashMap<(ContentType, i64), String>,
}

impl<'a> Enricher<'a> {
    pub(super) fn new(deps: &'a Deps, config: &'a PipelineConfig) -> Self {
        Self {
            deps,
            config,
            names: HashMap::new(),
            titles: HashMap::new(),
        }
    }

    /// Seed a title the caller already fetched.
    pub(super) fn remember_title(&mut self, content_type: ContentType, id: i64, title: String) {
        self.titles.insert((content_type, id), title);
    }

    /// Resolve distinct user ids concurrently ahead of a listing.
    pub(super) async fn prefetch_names(&mut self, ids: impl IntoIterator<Item = UserId>) {
        let mut pending: Vec<UserId> = ids
            .into_iter()
            .filter(|id| !self.names.contains_key(id))
            .collect();
        pending.sort_unstable();
        pending.dedup();
        if pending.is_empty() {
            return;
        }

        let deps = self.deps;
        let identity = &deps.identity;
        let lookups = pending.iter().map(|&id| async move {
            (id, identity.display_name(id).await)
        });
        for (id, result) in join_all(lookups).await {
            let name = self.name_or_placeholder(id, result);
            self.names.insert(id, name);
        }
    }

    pub(super) async fn user_name(&mut self, id: UserId) -> String {
        if let Some(name) = self.names.get(&id) {
            return name.clone();
        }
        let result = self.deps.identity.display_name(id).await;
        let name = self.name_or_placeholder(id, result);
        self.names.insert(id, name.clone());
        name
    }

    fn name_or_placeholder(&self, id: UserId, result: anyhow::Result<Option<String>>) -> String {
        match result {
            Ok(Some(name)) => name,
            Ok(None) => self.config.unknown_user.clone(),
            Err(e) => {
                warn!(user_id = id, error = %e, "identity lookup failed");
                self.config.unknown_user.clone()
            }
        }
    }

    /// Title of any reportable content. Chapters and novels come from the
    /// content gateway, comments and reviews from the local store.
    pub(super) async fn title(&mut self, content_type: ContentType, id: i64) -> String {
        if let Some(title) = self.titles.get(&(content_type, id)) {
            return title.clone();
        }
        let found = match content_type {
            ContentType::Novel | ContentType::Chapter => {
                match self.deps.content.get_target(content_type, id).await {
                    Ok(target) => target.map(|t| t.title),
                    Err(e) => {
                        warn!(%content_type, id, error = %e, "title lookup failed");
                        None
                    }
                }
            }
            ContentType::Comment => match self.deps.comments.find(id).await {
                Ok(comment) => comment.map(|c| excerpt(&c.content)),
                Err(e) => {
                    warn!(%content_type, id, error = %e, "title lookup failed");
                    None
                }
            },
            ContentType::Review => match self.deps.reviews.find(id).await {
                Ok(review) => review.map(|r| r.title),
                Err(e) => {
                    warn!(%content_type, id, error = %e, "title lookup failed");
                    None
                }
            },
        };
        let title = found.unwrap_or_else(|| format!("{} not found", content_type.label()));
        self.titles.insert((content_type, id), title.clone());
        title
    }

    pub(super) async fn comment(&mut self, comment: Comment, viewer: Option<UserId>) -> CommentView {
        let user_name = self.user_name(comment.user_id).await;
        let chapter_title = self.title(ContentType::Chapter, comment.chapter_id).await;
        CommentView {
            is_own_comment: viewer == Some(comment.user_id),
            comment,
            user_name,
            chapter_title,
        }
    }

    pub(super) async fn review(&mut self, review: Review, viewer: Option<UserId>) -> ReviewView {
        let user_name = self.user_name(review.user_id).await;
        let novel_title = self.title(ContentType::Novel, review.novel_id).await;
        ReviewView {
            is_own_review: viewer == Some(review.user_id),
            review,
            user_name,
            novel_title,
        }
    }

    pub(super) async fn vote(&mut self, vote: Vote) -> VoteView {
        let user_name = self.user_name(vote.user_id).await;
        let novel_title = self.title(ContentType::Novel, vote.novel_id).await;
        VoteView {
            vote,
            user_name,
            novel_title,
        }
    }

    pub(super) async fn report(&mut self, report: Report) -> ReportView {
        let reporter_name = self.user_name(report.reporter_id).await;
        let content_title = self.title(report.content_type, report.content_id).await;
        let resolver_name = match report.resolved_by {
            Some(admin) => Some(self.user_name(admin).await),
            None => None,
        };
        ReportView {
            report,
            reporter_name,
            content_title,
            resolver_name,
        }
    }
}

/// First few characters of a comment, for report listings.
pub(super) fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_long_text_on_char_boundaries() {
        assert_eq!(excerpt("short"), "short");
        let long = "é".repeat(60);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
        assert!(cut.ends_with("..."));
    }
}
