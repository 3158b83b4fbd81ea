use super::{ensure_owner, load, required_text, store_unavailable, Pipeline, ReviewView};
use crate::error::{EngageError, Result};
use crate::events::EngagementEvent;
use crate::page::{Page, PageRequest};
use crate::record::{
    Actor, ContentType, NewReview, NovelId, Record, RecordId, RecordKind, Review, ReviewInput,
    ReviewPatch, UserId,
};
use chrono::Utc;
use tracing::{debug, info};

const ALREADY_REVIEWED: &str = "You have already reviewed this novel";
const RATING_RANGE: std::ops::RangeInclusive<i16> = 1..=5;

fn validate_rating(rating: i16) -> Result<i16> {
    if RATING_RANGE.contains(&rating) {
        Ok(rating)
    } else {
        Err(EngageError::validation(format!(
            "rating must be between {} and {}",
            RATING_RANGE.start(),
            RATING_RANGE.end()
        )))
    }
}

impl Pipeline {
    pub async fn create_review(
        &self,
        actor: &Actor,
        novel_id: NovelId,
        input: ReviewInput,
    ) -> Result<ReviewView> {
        let rating = validate_rating(input.rating)?;
        let title = required_text("title", &input.title, self.config.max_review_title_length)?;
        let content = required_text("content", &input.content, self.config.max_review_length)?;

        self.require_target_exists(ContentType::Novel, novel_id)
            .await?;
        self.reject_duplicate::<Review, _>(
            &*self.deps.reviews,
            actor.id,
            &novel_id,
            ALREADY_REVIEWED,
        )
        .await?;

        let draft = NewReview {
            user_id: actor.id,
            novel_id,
            rating,
            title,
            content,
            is_spoiler: input.is_spoiler,
            create_time: Utc::now(),
        };
        let review: Review = self
            .insert::<Review, _>(&*self.deps.reviews, draft, ALREADY_REVIEWED)
            .await?;
        info!(review_id = review.id, novel_id, user_id = actor.id, rating, "review created");

        self.after_create(
            self.grant(actor.id, RecordKind::Review, self.config.rewards.review_experience),
            EngagementEvent::ReviewCreated {
                review_id: review.id,
                user_id: actor.id,
                novel_id,
                rating,
            },
            Review::scope(&novel_id),
        )
        .await;

        Ok(self.enricher().review(review, Some(actor.id)).await)
    }

    pub async fn update_review(
        &self,
        actor: &Actor,
        review_id: RecordId,
        patch: ReviewPatch,
    ) -> Result<ReviewView> {
        let cfg = &self.config;
        let patch = ReviewPatch {
            rating: patch.rating.map(validate_rating).transpose()?,
            title: patch
                .title
                .map(|t| required_text("title", &t, cfg.max_review_title_length))
                .transpose()?,
            content: patch
                .content
                .map(|c| required_text("content", &c, cfg.max_review_length))
                .transpose()?,
            is_spoiler: patch.is_spoiler,
        };

        let mut review: Review = load(&*self.deps.reviews, review_id).await?;
        ensure_owner(&review, actor)?;

        let changes = patch.diff_against(&review);
        if changes.is_empty() {
            debug!(review_id, "review update is a no-op");
        } else {
            let now = Utc::now();
            self.deps
                .reviews
                .update_fields(review_id, &changes, now)
                .await
                .map_err(store_unavailable)?;
            review.apply(&changes, now);
            info!(review_id, user_id = actor.id, "review updated");
        }

        Ok(self.enricher().review(review, Some(actor.id)).await)
    }

    pub async fn delete_review(&self, actor: &Actor, review_id: RecordId) -> Result<bool> {
        self.delete_record::<Review, _>(&*self.deps.reviews, actor, review_id)
            .await
    }

    pub async fn get_review(&self, viewer: Option<&Actor>, review_id: RecordId) -> Result<ReviewView> {
        let review: Review = load(&*self.deps.reviews, review_id).await?;
        Ok(self.enricher().review(review, viewer.map(|a| a.id)).await)
    }

    pub async fn list_novel_reviews(
        &self,
        viewer: Option<&Actor>,
        novel_id: NovelId,
        page: PageRequest,
    ) -> Result<Page<ReviewView>> {
        let page = self
            .cached_list::<Review, _>(&*self.deps.reviews, &novel_id, self.page(page))
            .await?;
        Ok(self.enrich_reviews(page, viewer).await)
    }

    pub async fn list_user_reviews(
        &self,
        viewer: Option<&Actor>,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<ReviewView>> {
        let page = self
            .deps
            .reviews
            .list_by_owner(user_id, self.page(page))
            .await
            .map_err(store_unavailable)?;
        Ok(self.enrich_reviews(page, viewer).await)
    }

    pub async fn toggle_review_like(&self, review_id: RecordId, increasing: bool) -> Result<()> {
        self.toggle_counter::<Review, _>(&*self.deps.reviews, review_id, increasing)
            .await
    }

    pub async fn batch_delete_reviews(&self, actor: &Actor, ids: &[RecordId]) -> Result<usize> {
        self.batch_delete::<Review, _>(&*self.deps.reviews, actor, ids)
            .await
    }

    pub async fn bulk_set_review_spoiler(
        &self,
        actor: &Actor,
        ids: &[RecordId],
        is_spoiler: bool,
    ) -> Result<usize> {
        self.bulk_update::<Review, _, _>(&*self.deps.reviews, actor, ids, |r| {
            (r.is_spoiler != is_spoiler).then(|| ReviewPatch {
                is_spoiler: Some(is_spoiler),
                ..ReviewPatch::default()
            })
        })
        .await
    }

    async fn enrich_reviews(&self, page: Page<Review>, viewer: Option<&Actor>) -> Page<ReviewView> {
        let viewer = viewer.map(|a| a.id);
        let mut enricher = self.enricher();
        enricher
            .prefetch_names(page.items.iter().map(|r| r.user_id))
            .await;

        let mut views = Vec::with_capacity(page.items.len());
        for review in page.items {
            views.push(enricher.review(review, viewer).await);
        }
        Page {
            items: views,
            total: page.total,
            page: page.page,
            size: page.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(matches!(validate_rating(0), Err(EngageError::Validation(_))));
        assert!(matches!(validate_rating(6), Err(EngageError::Validation(_))));
    }
}
