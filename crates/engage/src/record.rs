//! Record kinds owned by the record store.
//!
//! Every kind implements [`Record`], which is what lets the pipeline and the
//! in-memory store treat comments, reviews, votes and reports uniformly while
//! each keeps its own target, draft and change shapes.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{self, Debug};
use std::str::FromStr;

pub type RecordId = i64;
pub type UserId = i64;
pub type ChapterId = i64;
pub type NovelId = i64;

/// The four mutation targets handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    Comment,
    Review,
    Vote,
    Report,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Comment => "Comment",
            RecordKind::Review => "Review",
            RecordKind::Vote => "Vote",
            RecordKind::Report => "Report",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of content a report (or a gateway lookup) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Novel,
    Chapter,
    Comment,
    Review,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Novel => "NOVEL",
            ContentType::Chapter => "CHAPTER",
            ContentType::Comment => "COMMENT",
            ContentType::Review => "REVIEW",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentType::Novel => "Novel",
            ContentType::Chapter => "Chapter",
            ContentType::Comment => "Comment",
            ContentType::Review => "Review",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOVEL" => Ok(ContentType::Novel),
            "CHAPTER" => Ok(ContentType::Chapter),
            "COMMENT" => Ok(ContentType::Comment),
            "REVIEW" => Ok(ContentType::Review),
            other => Err(format!("unknown content type: {other}")),
        }
    }
}

/// Report lifecycle. `InReview` is initial, the other two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    #[default]
    InReview,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::InReview => "IN_REVIEW",
            ReportStatus::Resolved => "RESOLVED",
            ReportStatus::Dismissed => "DISMISSED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ReportStatus::InReview)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN_REVIEW" => Ok(ReportStatus::InReview),
            "RESOLVED" => Ok(ReportStatus::Resolved),
            "DISMISSED" => Ok(ReportStatus::Dismissed),
            other => Err(format!("unknown report status: {other}")),
        }
    }
}

/// Role resolved by the request layer before the pipeline is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Reader,
    Admin,
}

/// An already-authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn reader(id: UserId) -> Self {
        Self {
            id,
            role: Role::Reader,
        }
    }

    pub fn admin(id: UserId) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Shared shape of the four record kinds.
///
/// `materialize`, `apply` and `adjust_likes` describe what a store does to a
/// row; backends that run SQL express the same semantics in their queries.
pub trait Record: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: RecordKind;

    /// Whether at most one record may exist per (owner, target).
    const UNIQUE_PER_TARGET: bool;

    type Target: Clone + Debug + PartialEq + Send + Sync;
    type Draft: Clone + Debug + Send + Sync;
    type Changes: Debug + Send + Sync;

    fn id(&self) -> RecordId;
    fn owner(&self) -> UserId;
    fn target(&self) -> Self::Target;
    fn create_time(&self) -> DateTime<Utc>;
    fn update_time(&self) -> DateTime<Utc>;

    fn materialize(id: RecordId, draft: Self::Draft) -> Self;
    fn apply(&mut self, changes: &Self::Changes, now: DateTime<Utc>);

    /// Apply a like delta, flooring at zero. Returns false for kinds
    /// without a like counter.
    fn adjust_likes(&mut self, _delta: i64) -> bool {
        false
    }

    /// Cache scope for listings of this kind under `target`.
    fn scope(target: &Self::Target) -> String;
}

// ── Comment ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: RecordId,
    pub user_id: UserId,
    pub chapter_id: ChapterId,
    pub content: String,
    pub is_spoiler: bool,
    pub like_count: i64,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Caller payload for a new comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentInput {
    pub content: String,
    #[serde(default)]
    pub is_spoiler: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub user_id: UserId,
    pub chapter_id: ChapterId,
    pub content: String,
    pub is_spoiler: bool,
    pub create_time: DateTime<Utc>,
}

/// Partial update. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPatch {
    pub content: Option<String>,
    pub is_spoiler: Option<bool>,
}

impl CommentPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.is_spoiler.is_none()
    }

    /// Keep only the fields that differ from `current`, text compared trimmed.
    pub fn diff_against(&self, current: &Comment) -> CommentPatch {
        CommentPatch {
            content: changed_text(self.content.as_deref(), &current.content),
            is_spoiler: self.is_spoiler.filter(|v| *v != current.is_spoiler),
        }
    }
}

impl Record for Comment {
    const KIND: RecordKind = RecordKind::Comment;
    const UNIQUE_PER_TARGET: bool = true;

    type Target = ChapterId;
    type Draft = NewComment;
    type Changes = CommentPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> UserId {
        self.user_id
    }

    fn target(&self) -> ChapterId {
        self.chapter_id
    }

    fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    fn materialize(id: RecordId, draft: NewComment) -> Self {
        Comment {
            id,
            user_id: draft.user_id,
            chapter_id: draft.chapter_id,
            content: draft.content,
            is_spoiler: draft.is_spoiler,
            like_count: 0,
            create_time: draft.create_time,
            update_time: draft.create_time,
        }
    }

    fn apply(&mut self, changes: &CommentPatch, now: DateTime<Utc>) {
        if let Some(content) = &changes.content {
            self.content = content.clone();
        }
        if let Some(is_spoiler) = changes.is_spoiler {
            self.is_spoiler = is_spoiler;
        }
        self.update_time = now;
    }

    fn adjust_likes(&mut self, delta: i64) -> bool {
        self.like_count = (self.like_count + delta).max(0);
        true
    }

    fn scope(chapter_id: &ChapterId) -> String {
        format!("comments:chapter:{chapter_id}")
    }
}

// ── Review ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: RecordId,
    pub user_id: UserId,
    pub novel_id: NovelId,
    pub rating: i16,
    pub title: String,
    pub content: String,
    pub is_spoiler: bool,
    pub like_count: i64,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub rating: i16,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_spoiler: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub user_id: UserId,
    pub novel_id: NovelId,
    pub rating: i16,
    pub title: String,
    pub content: String,
    pub is_spoiler: bool,
    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatch {
    pub rating: Option<i16>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_spoiler: Option<bool>,
}

impl ReviewPatch {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none()
            && self.title.is_none()
            && self.content.is_none()
            && self.is_spoiler.is_none()
    }

    pub fn diff_against(&self, current: &Review) -> ReviewPatch {
        ReviewPatch {
            rating: self.rating.filter(|r| *r != current.rating),
            title: changed_text(self.title.as_deref(), &current.title),
            content: changed_text(self.content.as_deref(), &current.content),
            is_spoiler: self.is_spoiler.filter(|v| *v != current.is_spoiler),
        }
    }
}

impl Record for Review {
    const KIND: RecordKind = RecordKind::Review;
    const UNIQUE_PER_TARGET: bool = true;

    type Target = NovelId;
    type Draft = NewReview;
    type Changes = ReviewPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> UserId {
        self.user_id
    }

    fn target(&self) -> NovelId {
        self.novel_id
    }

    fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    fn materialize(id: RecordId, draft: NewReview) -> Self {
        Review {
            id,
            user_id: draft.user_id,
            novel_id: draft.novel_id,
            rating: draft.rating,
            title: draft.title,
            content: draft.content,
            is_spoiler: draft.is_spoiler,
            like_count: 0,
            create_time: draft.create_time,
            update_time: draft.create_time,
        }
    }

    fn apply(&mut self, changes: &ReviewPatch, now: DateTime<Utc>) {
        if let Some(rating) = changes.rating {
            self.rating = rating;
        }
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(content) = &changes.content {
            self.content = content.clone();
        }
        if let Some(is_spoiler) = changes.is_spoiler {
            self.is_spoiler = is_spoiler;
        }
        self.update_time = now;
    }

    fn adjust_likes(&mut self, delta: i64) -> bool {
        self.like_count = (self.like_count + delta).max(0);
        true
    }

    fn scope(novel_id: &NovelId) -> String {
        format!("reviews:novel:{novel_id}")
    }
}

// ── Vote ──

/// Immutable once cast; repeat votes are separate rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: RecordId,
    pub user_id: UserId,
    pub novel_id: NovelId,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVote {
    pub user_id: UserId,
    pub novel_id: NovelId,
    pub create_time: DateTime<Utc>,
}

impl Record for Vote {
    const KIND: RecordKind = RecordKind::Vote;
    const UNIQUE_PER_TARGET: bool = false;

    type Target = NovelId;
    type Draft = NewVote;
    type Changes = Infallible;

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> UserId {
        self.user_id
    }

    fn target(&self) -> NovelId {
        self.novel_id
    }

    fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    fn materialize(id: RecordId, draft: NewVote) -> Self {
        Vote {
            id,
            user_id: draft.user_id,
            novel_id: draft.novel_id,
            create_time: draft.create_time,
            update_time: draft.create_time,
        }
    }

    fn apply(&mut self, changes: &Infallible, _now: DateTime<Utc>) {
        match *changes {}
    }

    fn scope(novel_id: &NovelId) -> String {
        format!("votes:novel:{novel_id}")
    }
}

// ── Report ──

/// What a report points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTarget {
    pub content_type: ContentType,
    pub content_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: RecordId,
    pub reporter_id: UserId,
    pub content_type: ContentType,
    pub content_id: i64,
    pub reason: String,
    pub status: ReportStatus,
    pub admin_notes: Option<String>,
    pub resolved_by: Option<UserId>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    pub content_type: ContentType,
    pub content_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub reporter_id: UserId,
    pub content_type: ContentType,
    pub content_id: i64,
    pub reason: String,
    pub create_time: DateTime<Utc>,
}

/// The only mutation a report accepts after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportResolution {
    pub status: ReportStatus,
    pub admin_notes: Option<String>,
    pub resolved_by: UserId,
}

impl Record for Report {
    const KIND: RecordKind = RecordKind::Report;
    const UNIQUE_PER_TARGET: bool = true;

    type Target = ReportTarget;
    type Draft = NewReport;
    type Changes = ReportResolution;

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> UserId {
        self.reporter_id
    }

    fn target(&self) -> ReportTarget {
        ReportTarget {
            content_type: self.content_type,
            content_id: self.content_id,
        }
    }

    fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    fn materialize(id: RecordId, draft: NewReport) -> Self {
        Report {
            id,
            reporter_id: draft.reporter_id,
            content_type: draft.content_type,
            content_id: draft.content_id,
            reason: draft.reason,
            status: ReportStatus::InReview,
            admin_notes: None,
            resolved_by: None,
            create_time: draft.create_time,
            update_time: draft.create_time,
        }
    }

    fn apply(&mut self, changes: &ReportResolution, now: DateTime<Utc>) {
        self.status = changes.status;
        self.admin_notes = changes.admin_notes.clone();
        self.resolved_by = Some(changes.resolved_by);
        self.update_time = now;
    }

    fn scope(target: &ReportTarget) -> String {
        format!(
            "reports:{}:{}",
            target.content_type.as_str().to_ascii_lowercase(),
            target.content_id
        )
    }
}

/// Trimmed replacement text, if it differs from the current value.
fn changed_text(candidate: Option<&str>, current: &str) -> Option<String> {
    let trimmed = candidate?.trim();
    (trimmed != current.trim()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment() -> Comment {
        let now = Utc::now();
        Comment::materialize(
            1,
            NewComment {
                user_id: 10,
                chapter_id: 7,
                content: "nice chapter".into(),
                is_spoiler: false,
                create_time: now,
            },
        )
    }

    #[test]
    fn materialize_zeroes_likes_and_aligns_timestamps() {
        let c = comment();
        assert_eq!(c.like_count, 0);
        assert_eq!(c.create_time, c.update_time);
    }

    #[test]
    fn comment_diff_ignores_whitespace_only_changes() {
        let patch = CommentPatch {
            content: Some("  nice chapter \n".into()),
            is_spoiler: Some(false),
        };
        assert!(patch.diff_against(&comment()).is_empty());
    }

    #[test]
    fn comment_diff_keeps_trimmed_changes() {
        let patch = CommentPatch {
            content: Some("  even better  ".into()),
            is_spoiler: None,
        };
        let diff = patch.diff_against(&comment());
        assert_eq!(diff.content.as_deref(), Some("even better"));
        assert_eq!(diff.is_spoiler, None);
    }

    #[test]
    fn review_diff_only_reports_changed_rating() {
        let now = Utc::now();
        let review = Review::materialize(
            4,
            NewReview {
                user_id: 1,
                novel_id: 2,
                rating: 4,
                title: "Solid".into(),
                content: "Good pacing".into(),
                is_spoiler: false,
                create_time: now,
            },
        );
        let patch = ReviewPatch {
            rating: Some(5),
            title: Some("Solid".into()),
            content: None,
            is_spoiler: Some(false),
        };
        let diff = patch.diff_against(&review);
        assert_eq!(
            diff,
            ReviewPatch {
                rating: Some(5),
                ..ReviewPatch::default()
            }
        );
    }

    #[test]
    fn likes_never_go_negative() {
        let mut c = comment();
        assert!(c.adjust_likes(-1));
        assert_eq!(c.like_count, 0);
        c.adjust_likes(1);
        c.adjust_likes(1);
        c.adjust_likes(-1);
        assert_eq!(c.like_count, 1);
    }

    #[test]
    fn report_status_parses_case_insensitively() {
        assert_eq!("resolved".parse::<ReportStatus>(), Ok(ReportStatus::Resolved));
        assert_eq!(" DISMISSED ".parse::<ReportStatus>(), Ok(ReportStatus::Dismissed));
        assert!("CLOSED".parse::<ReportStatus>().is_err());
        assert!(ReportStatus::Resolved.is_terminal());
        assert!(!ReportStatus::InReview.is_terminal());
    }

    #[test]
    fn records_serialize_camel_case() {
        let json = serde_json::to_value(comment()).unwrap();
        assert_eq!(json["chapterId"], 7);
        assert_eq!(json["isSpoiler"], false);
        assert_eq!(json["likeCount"], 0);
    }

    #[test]
    fn scopes_are_kind_and_target_specific() {
        assert_eq!(Comment::scope(&7), "comments:chapter:7");
        assert_eq!(Review::scope(&7), "reviews:novel:7");
        assert_eq!(
            Report::scope(&ReportTarget {
                content_type: ContentType::Comment,
                content_id: 3
            }),
            "reports:comment:3"
        );
    }
}
