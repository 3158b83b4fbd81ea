use super::{load, store_unavailable, Pipeline, VoteView};
use crate::error::{EngageError, Result};
use crate::events::EngagementEvent;
use crate::page::{Page, PageRequest};
use crate::record::{
    Actor, ContentType, NewVote, NovelId, Record, RecordId, RecordKind, UserId, Vote,
};
use chrono::Utc;
use tracing::info;

impl Pipeline {
    /// Cast a vote. Repeat votes are allowed; voting for a novel you wrote is
    /// not, and the reward gateway decides eligibility.
    pub async fn create_vote(&self, actor: &Actor, novel_id: NovelId) -> Result<VoteView> {
        let novel = self.require_target(ContentType::Novel, novel_id).await?;
        if novel.owner_id == Some(actor.id) {
            return Err(EngageError::invalid("You cannot vote for your own novel"));
        }

        let eligibility = self
            .deps
            .rewards
            .check_vote_eligibility(actor.id)
            .await
            .map_err(|e| EngageError::unavailable("reward gateway", e))?;
        if !eligibility.allowed {
            let reason = eligibility
                .reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| self.config.vote_denied_message.clone());
            return Err(EngageError::invalid(reason));
        }

        let draft = NewVote {
            user_id: actor.id,
            novel_id,
            create_time: Utc::now(),
        };
        let vote: Vote = self
            .insert::<Vote, _>(&*self.deps.votes, draft, "Vote already recorded")
            .await?;
        info!(vote_id = vote.id, novel_id, user_id = actor.id, "vote cast");

        self.after_create(
            self.grant(actor.id, RecordKind::Vote, self.config.rewards.vote_experience),
            EngagementEvent::VoteCast {
                vote_id: vote.id,
                user_id: actor.id,
                novel_id,
            },
            Vote::scope(&novel_id),
        )
        .await;

        let mut enricher = self.enricher();
        enricher.remember_title(ContentType::Novel, novel_id, novel.title);
        Ok(enricher.vote(vote).await)
    }

    pub async fn delete_vote(&self, actor: &Actor, vote_id: RecordId) -> Result<bool> {
        self.delete_record::<Vote, _>(&*self.deps.votes, actor, vote_id)
            .await
    }

    pub async fn get_vote(&self, vote_id: RecordId) -> Result<VoteView> {
        let vote: Vote = load(&*self.deps.votes, vote_id).await?;
        Ok(self.enricher().vote(vote).await)
    }

    pub async fn list_novel_votes(
        &self,
        novel_id: NovelId,
        page: PageRequest,
    ) -> Result<Page<VoteView>> {
        let page = self
            .cached_list::<Vote, _>(&*self.deps.votes, &novel_id, self.page(page))
            .await?;
        Ok(self.enrich_votes(page).await)
    }

    pub async fn list_user_votes(&self, user_id: UserId, page: PageRequest) -> Result<Page<VoteView>> {
        let page = self
            .deps
            .votes
            .list_by_owner(user_id, self.page(page))
            .await
            .map_err(store_unavailable)?;
        Ok(self.enrich_votes(page).await)
    }

    /// Total votes cast for a novel.
    pub async fn count_novel_votes(&self, novel_id: NovelId) -> Result<u64> {
        let page = self
            .cached_list::<Vote, _>(&*self.deps.votes, &novel_id, PageRequest::first(1))
            .await?;
        Ok(page.total)
    }

    pub async fn batch_delete_votes(&self, actor: &Actor, ids: &[RecordId]) -> Result<usize> {
        self.batch_delete::<Vote, _>(&*self.deps.votes, actor, ids)
            .await
    }

    async fn enrich_votes(&self, page: Page<Vote>) -> Page<VoteView> {
        let mut enricher = self.enricher();
        enricher
            .prefetch_names(page.items.iter().map(|v| v.user_id))
            .await;

        let mut views = Vec::with_capacity(page.items.len());
        for vote in page.items {
            views.push(enricher.vote(vote).await);
        }
        Page {
            items: views,
            total: page.total,
            page: page.page,
            size: page.size,
        }
    }
}
