//! Reports and their resolution state machine.
//!
//! ```text
//! IN_REVIEW ──resolve(RESOLVED)──► RESOLVED
//!     │
//!     └──────resolve(DISMISSED)──► DISMISSED
//! ```
//!
//! `resolve` does not look at the current status: resolving a terminal
//! report again overwrites status, notes and resolver.

use super::enrich::excerpt;
use super::{load, require_admin, required_text, store_unavailable, Pipeline, ReportView};
use crate::error::{EngageError, Result};
use crate::events::EngagementEvent;
use crate::gateway::TargetInfo;
use crate::page::{Page, PageRequest};
use crate::record::{
    Actor, Comment, ContentType, NewReport, Record, RecordId, RecordKind, Report, ReportInput,
    ReportResolution, ReportStatus, ReportTarget, Review, UserId,
};
use chrono::Utc;
use tracing::{debug, info};

const ALREADY_REPORTED: &str = "You have already reported this content";

impl Pipeline {
    pub async fn create_report(&self, actor: &Actor, input: ReportInput) -> Result<ReportView> {
        let reason = required_text("reason", &input.reason, self.config.max_report_reason_length)?;
        let target = ReportTarget {
            content_type: input.content_type,
            content_id: input.content_id,
        };

        let content = self.resolve_report_target(target).await?;
        if content.owner_id == Some(actor.id) {
            return Err(EngageError::invalid("You cannot report your own content"));
        }
        self.reject_duplicate::<Report, _>(
            &*self.deps.reports,
            actor.id,
            &target,
            ALREADY_REPORTED,
        )
        .await?;

        let draft = NewReport {
            reporter_id: actor.id,
            content_type: target.content_type,
            content_id: target.content_id,
            reason,
            create_time: Utc::now(),
        };
        let report: Report = self
            .insert::<Report, _>(&*self.deps.reports, draft, ALREADY_REPORTED)
            .await?;
        info!(
            report_id = report.id,
            content_type = %target.content_type,
            content_id = target.content_id,
            reporter_id = actor.id,
            "report filed"
        );

        self.after_create(
            self.grant(actor.id, RecordKind::Report, self.config.rewards.report_experience),
            EngagementEvent::ReportFiled {
                report_id: report.id,
                reporter_id: actor.id,
                content_type: target.content_type,
                content_id: target.content_id,
                reason: report.reason.clone(),
            },
            Report::scope(&target),
        )
        .await;

        let mut enricher = self.enricher();
        enricher.remember_title(target.content_type, target.content_id, content.title);
        Ok(enricher.report(report).await)
    }

    /// Existence, title and owner of the reported content. Chapters and
    /// novels are asked of the content gateway; comments and reviews live here.
    async fn resolve_report_target(&self, target: ReportTarget) -> Result<TargetInfo> {
        let id = target.content_id;
        match target.content_type {
            ContentType::Novel | ContentType::Chapter => {
                self.require_target(target.content_type, id).await
            }
            ContentType::Comment => {
                let comment: Comment = load(&*self.deps.comments, id).await?;
                Ok(TargetInfo {
                    title: excerpt(&comment.content),
                    owner_id: Some(comment.user_id),
                })
            }
            ContentType::Review => {
                let review: Review = load(&*self.deps.reviews, id).await?;
                Ok(TargetInfo {
                    title: review.title,
                    owner_id: Some(review.user_id),
                })
            }
        }
    }

    /// Admin only. `action` must name a terminal status.
    pub async fn resolve_report(
        &self,
        actor: &Actor,
        report_id: RecordId,
        action: &str,
        notes: Option<String>,
    ) -> Result<ReportView> {
        require_admin(actor, "resolving a report")?;
        let status = match action.parse::<ReportStatus>() {
            Ok(status) if status.is_terminal() => status,
            _ => {
                return Err(EngageError::validation(format!(
                    "invalid action {action:?}: expected RESOLVED or DISMISSED"
                )))
            }
        };

        let current: Report = load(&*self.deps.reports, report_id).await?;
        if current.status.is_terminal() {
            debug!(report_id, previous = %current.status, "overwriting terminal report");
        }

        let resolution = ReportResolution {
            status,
            admin_notes: notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            resolved_by: actor.id,
        };
        self.deps
            .reports
            .update_fields(report_id, &resolution, Utc::now())
            .await
            .map_err(store_unavailable)?;
        info!(report_id, %status, admin = actor.id, "report resolved");

        let report: Report = load(&*self.deps.reports, report_id).await?;
        Ok(self.enricher().report(report).await)
    }

    /// Visible to the reporter and to admins.
    pub async fn get_report(&self, actor: &Actor, report_id: RecordId) -> Result<ReportView> {
        let report: Report = load(&*self.deps.reports, report_id).await?;
        if report.reporter_id != actor.id && !actor.is_admin() {
            return Err(EngageError::forbidden("You can only view your own reports"));
        }
        Ok(self.enricher().report(report).await)
    }

    pub async fn list_my_reports(&self, actor: &Actor, page: PageRequest) -> Result<Page<ReportView>> {
        let page = self
            .deps
            .reports
            .list_by_owner(actor.id, self.page(page))
            .await
            .map_err(store_unavailable)?;
        Ok(self.enrich_reports(page).await)
    }

    /// Admin review queue.
    pub async fn list_reports(
        &self,
        actor: &Actor,
        status: Option<ReportStatus>,
        page: PageRequest,
    ) -> Result<Page<ReportView>> {
        require_admin(actor, "the report queue")?;
        let page = self
            .deps
            .reports
            .list_by_status(status, self.page(page))
            .await
            .map_err(store_unavailable)?;
        Ok(self.enrich_reports(page).await)
    }

    /// Admin only: every report against one piece of content. Not cached,
    /// since resolution changes status without invalidating anything.
    pub async fn list_content_reports(
        &self,
        actor: &Actor,
        target: ReportTarget,
        page: PageRequest,
    ) -> Result<Page<ReportView>> {
        require_admin(actor, "listing reports by content")?;
        let page = self
            .deps
            .reports
            .list_by_target(&target, self.page(page))
            .await
            .map_err(store_unavailable)?;
        Ok(self.enrich_reports(page).await)
    }

    /// Reporter or admin.
    pub async fn delete_report(&self, actor: &Actor, report_id: RecordId) -> Result<bool> {
        self.delete_record::<Report, _>(&*self.deps.reports, actor, report_id)
            .await
    }

    pub async fn batch_delete_reports(&self, actor: &Actor, ids: &[RecordId]) -> Result<usize> {
        self.batch_delete::<Report, _>(&*self.deps.reports, actor, ids)
            .await
    }

    async fn enrich_reports(&self, page: Page<Report>) -> Page<ReportView> {
        let mut enricher = self.enricher();
        let people: Vec<UserId> = page
            .items
            .iter()
            .flat_map(|r| std::iter::once(r.reporter_id).chain(r.resolved_by))
            .collect();
        enricher.prefetch_names(people).await;

        let mut views = Vec::with_capacity(page.items.len());
        for report in page.items {
            views.push(enricher.report(report).await);
        }
        Page {
            items: views,
            total: page.total,
            page: page.page,
            size: page.size,
        }
    }
}
