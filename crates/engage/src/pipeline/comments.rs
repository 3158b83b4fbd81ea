use super::{ensure_owner, load, required_text, store_unavailable, CommentView, Pipeline};
use crate::error::Result;
use crate::events::EngagementEvent;
use crate::page::{Page, PageRequest};
use crate::record::{
    Actor, ChapterId, Comment, CommentInput, CommentPatch, ContentType, NewComment, Record,
    RecordId, RecordKind, UserId,
};
use chrono::Utc;
use tracing::{debug, info};

const ALREADY_COMMENTED: &str = "You have already commented on this chapter";

impl Pipeline {
    pub async fn create_comment(
        &self,
        actor: &Actor,
        chapter_id: ChapterId,
        input: CommentInput,
    ) -> Result<CommentView> {
        let content = required_text("content", &input.content, self.config.max_comment_length)?;

        self.require_target_exists(ContentType::Chapter, chapter_id)
            .await?;
        self.reject_duplicate::<Comment, _>(
            &*self.deps.comments,
            actor.id,
            &chapter_id,
            ALREADY_COMMENTED,
        )
        .await?;

        let draft = NewComment {
            user_id: actor.id,
            chapter_id,
            content,
            is_spoiler: input.is_spoiler,
            create_time: Utc::now(),
        };
        let comment: Comment = self
            .insert::<Comment, _>(&*self.deps.comments, draft, ALREADY_COMMENTED)
            .await?;
        info!(comment_id = comment.id, chapter_id, user_id = actor.id, "comment created");

        self.after_create(
            self.grant(actor.id, RecordKind::Comment, self.config.rewards.comment_experience),
            EngagementEvent::CommentCreated {
                comment_id: comment.id,
                user_id: actor.id,
                chapter_id,
                is_spoiler: comment.is_spoiler,
            },
            Comment::scope(&chapter_id),
        )
        .await;

        Ok(self.enricher().comment(comment, Some(actor.id)).await)
    }

    /// Owner-only. Fields equal to the stored value are not written; if none
    /// differ the store is not touched and `update_time` stays put.
    pub async fn update_comment(
        &self,
        actor: &Actor,
        comment_id: RecordId,
        patch: CommentPatch,
    ) -> Result<CommentView> {
        let patch = CommentPatch {
            content: patch
                .content
                .map(|c| required_text("content", &c, self.config.max_comment_length))
                .transpose()?,
            is_spoiler: patch.is_spoiler,
        };

        let mut comment: Comment = load(&*self.deps.comments, comment_id).await?;
        ensure_owner(&comment, actor)?;

        let changes = patch.diff_against(&comment);
        if changes.is_empty() {
            debug!(comment_id, "comment update is a no-op");
        } else {
            let now = Utc::now();
            self.deps
                .comments
                .update_fields(comment_id, &changes, now)
                .await
                .map_err(store_unavailable)?;
            comment.apply(&changes, now);
            info!(comment_id, user_id = actor.id, "comment updated");
        }

        Ok(self.enricher().comment(comment, Some(actor.id)).await)
    }

    /// Owner or admin.
    pub async fn delete_comment(&self, actor: &Actor, comment_id: RecordId) -> Result<bool> {
        self.delete_record::<Comment, _>(&*self.deps.comments, actor, comment_id)
            .await
    }

    pub async fn get_comment(
        &self,
        viewer: Option<&Actor>,
        comment_id: RecordId,
    ) -> Result<CommentView> {
        let comment: Comment = load(&*self.deps.comments, comment_id).await?;
        Ok(self
            .enricher()
            .comment(comment, viewer.map(|a| a.id))
            .await)
    }

    pub async fn list_chapter_comments(
        &self,
        viewer: Option<&Actor>,
        chapter_id: ChapterId,
        page: PageRequest,
    ) -> Result<Page<CommentView>> {
        let page = self
            .cached_list::<Comment, _>(&*self.deps.comments, &chapter_id, self.page(page))
            .await?;
        Ok(self.enrich_comments(page, viewer).await)
    }

    pub async fn list_user_comments(
        &self,
        viewer: Option<&Actor>,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<CommentView>> {
        let page = self
            .deps
            .comments
            .list_by_owner(user_id, self.page(page))
            .await
            .map_err(store_unavailable)?;
        Ok(self.enrich_comments(page, viewer).await)
    }

    /// Like or unlike. The store applies the delta atomically.
    pub async fn toggle_comment_like(&self, comment_id: RecordId, increasing: bool) -> Result<()> {
        self.toggle_counter::<Comment, _>(&*self.deps.comments, comment_id, increasing)
            .await
    }

    /// Admin only. Missing ids are skipped; returns how many were deleted.
    pub async fn batch_delete_comments(&self, actor: &Actor, ids: &[RecordId]) -> Result<usize> {
        self.batch_delete::<Comment, _>(&*self.deps.comments, actor, ids)
            .await
    }

    /// Admin only. Returns how many comments actually changed flag.
    pub async fn bulk_set_comment_spoiler(
        &self,
        actor: &Actor,
        ids: &[RecordId],
        is_spoiler: bool,
    ) -> Result<usize> {
        self.bulk_update::<Comment, _, _>(&*self.deps.comments, actor, ids, |c| {
            (c.is_spoiler != is_spoiler).then(|| CommentPatch {
                content: None,
                is_spoiler: Some(is_spoiler),
            })
        })
        .await
    }

    async fn enrich_comments(
        &self,
        page: Page<Comment>,
        viewer: Option<&Actor>,
    ) -> Page<CommentView> {
        let viewer = viewer.map(|a| a.id);
        let mut enricher = self.enricher();
        enricher
            .prefetch_names(page.items.iter().map(|c| c.user_id))
            .await;

        let Page {
            items,
            total,
            page,
            size,
        } = page;
        let mut views = Vec::with_capacity(items.len());
        for comment in items {
            views.push(enricher.comment(comment, viewer).await);
        }
        Page {
            items: views,
            total,
            page,
            size,
        }
    }
}
