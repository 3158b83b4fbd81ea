mod common;

use common::*;
use engage_core::{
    Actor, ContentType, EngageError, PageRequest, ReportInput, ReportStatus, ReportTarget,
    REPORT_CHANNEL,
};

fn report_of(content_type: ContentType, content_id: i64, reason: &str) -> ReportInput {
    ReportInput {
        content_type,
        content_id,
        reason: reason.to_string(),
    }
}

#[tokio::test]
async fn test_filing_a_report_starts_in_review_without_reward() {
    let h = harness();
    let pipeline = h.pipeline();

    let view = pipeline
        .create_report(
            &Actor::reader(ALICE),
            report_of(ContentType::Novel, NOVEL, "plagiarised"),
        )
        .await
        .unwrap();
    pipeline.settle().await;

    assert_eq!(view.report.status, ReportStatus::InReview);
    assert_eq!(view.report.resolved_by, None);
    assert_eq!(view.content_title, "The Long Road");
    assert_eq!(view.reporter_name, "alice");
    assert_eq!(view.resolver_name, None);

    assert!(h.rewards.grants().is_empty());
    let events = h.events.on_channel(REPORT_CHANNEL);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["event"]["contentType"], "NOVEL");
}

#[tokio::test]
async fn test_same_content_cannot_be_reported_twice_by_one_reader() {
    let h = harness();
    let pipeline = h.pipeline();
    let alice = Actor::reader(ALICE);

    pipeline
        .create_report(&alice, report_of(ContentType::Chapter, CHAPTER, "spam"))
        .await
        .unwrap();
    let err = pipeline
        .create_report(&alice, report_of(ContentType::Chapter, CHAPTER, "still spam"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::DuplicateRecord(_)));

    // A different piece of content, or a different reader, is fine.
    pipeline
        .create_report(&alice, report_of(ContentType::Novel, NOVEL, "spam"))
        .await
        .unwrap();
    pipeline
        .create_report(
            &Actor::reader(BOB),
            report_of(ContentType::Chapter, CHAPTER, "spam"),
        )
        .await
        .unwrap();
    assert_eq!(h.reports.len(), 3);
}

#[tokio::test]
async fn test_own_content_cannot_be_reported() {
    let h = harness();
    let pipeline = h.pipeline();

    let err = pipeline
        .create_report(
            &Actor::reader(AUTHOR),
            report_of(ContentType::Novel, NOVEL, "testing"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::InvalidOperation(_)));

    let alice = Actor::reader(ALICE);
    let comment_id = pipeline
        .create_comment(&alice, CHAPTER, comment("my own words"))
        .await
        .unwrap()
        .comment
        .id;
    let err = pipeline
        .create_report(&alice, report_of(ContentType::Comment, comment_id, "oops"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::InvalidOperation(_)));
    assert!(h.reports.is_empty());
}

#[tokio::test]
async fn test_comments_and_reviews_resolve_locally() {
    let h = harness();
    let pipeline = h.pipeline();

    let text = "This comment goes on and on well past the fifty character excerpt limit";
    let comment_id = pipeline
        .create_comment(&Actor::reader(ALICE), CHAPTER, comment(text))
        .await
        .unwrap()
        .comment
        .id;
    let review_id = pipeline
        .create_review(&Actor::reader(ALICE), NOVEL, review(1, "Awful"))
        .await
        .unwrap()
        .review
        .id;
    let calls = h.content.calls();

    let bob = Actor::reader(BOB);
    let on_comment = pipeline
        .create_report(&bob, report_of(ContentType::Comment, comment_id, "rude"))
        .await
        .unwrap();
    let on_review = pipeline
        .create_report(&bob, report_of(ContentType::Review, review_id, "rude"))
        .await
        .unwrap();

    let expected: String = text.chars().take(50).collect::<String>() + "...";
    assert_eq!(on_comment.content_title, expected);
    assert_eq!(on_review.content_title, "Awful");
    assert_eq!(h.content.calls(), calls);

    let err = pipeline
        .create_report(&bob, report_of(ContentType::Comment, 999, "ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::NotFound { .. }));
}

#[tokio::test]
async fn test_blank_reason_is_rejected() {
    let h = harness();
    let pipeline = h.pipeline();

    let err = pipeline
        .create_report(
            &Actor::reader(ALICE),
            report_of(ContentType::Novel, NOVEL, " \n "),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::Validation(_)));
    assert_eq!(h.content.calls(), 0);
}

#[tokio::test]
async fn test_resolution_overwrites_previous_outcome() {
    let h = harness();
    let pipeline = h.pipeline();
    let admin = Actor::admin(MODERATOR);

    let id = pipeline
        .create_report(
            &Actor::reader(ALICE),
            report_of(ContentType::Novel, NOVEL, "plagiarised"),
        )
        .await
        .unwrap()
        .report
        .id;

    let resolved = pipeline
        .resolve_report(&admin, id, "RESOLVED", Some("removed chapter 2".into()))
        .await
        .unwrap();
    assert_eq!(resolved.report.status, ReportStatus::Resolved);
    assert_eq!(resolved.report.resolved_by, Some(MODERATOR));
    assert_eq!(resolved.report.admin_notes.as_deref(), Some("removed chapter 2"));
    assert_eq!(resolved.resolver_name.as_deref(), Some("mod"));

    let dismissed = pipeline
        .resolve_report(&Actor::admin(501), id, "dismissed", None)
        .await
        .unwrap();
    assert_eq!(dismissed.report.status, ReportStatus::Dismissed);
    assert_eq!(dismissed.report.resolved_by, Some(501));
    assert_eq!(dismissed.report.admin_notes, None);
    assert_eq!(dismissed.resolver_name.as_deref(), Some("Unknown User"));
    assert_eq!(h.reports.get(id).unwrap().status, ReportStatus::Dismissed);
}

#[tokio::test]
async fn test_resolve_rejects_bad_actions_and_readers() {
    let h = harness();
    let pipeline = h.pipeline();
    let admin = Actor::admin(MODERATOR);

    let id = pipeline
        .create_report(
            &Actor::reader(ALICE),
            report_of(ContentType::Novel, NOVEL, "plagiarised"),
        )
        .await
        .unwrap()
        .report
        .id;

    for action in ["IN_REVIEW", "closed", ""] {
        let err = pipeline
            .resolve_report(&admin, id, action, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngageError::Validation(_)), "{action}: {err:?}");
    }

    let err = pipeline
        .resolve_report(&Actor::reader(BOB), id, "RESOLVED", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::Forbidden(_)));

    let err = pipeline
        .resolve_report(&admin, 999, "RESOLVED", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::NotFound { .. }));

    assert_eq!(h.reports.get(id).unwrap().status, ReportStatus::InReview);
}

#[tokio::test]
async fn test_report_visibility() {
    let h = harness();
    let pipeline = h.pipeline();
    let alice = Actor::reader(ALICE);

    let id = pipeline
        .create_report(&alice, report_of(ContentType::Chapter, CHAPTER, "spam"))
        .await
        .unwrap()
        .report
        .id;

    assert!(pipeline.get_report(&alice, id).await.is_ok());
    assert!(pipeline.get_report(&Actor::admin(MODERATOR), id).await.is_ok());
    let err = pipeline
        .get_report(&Actor::reader(BOB), id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::Forbidden(_)));

    let mine = pipeline
        .list_my_reports(&alice, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 1);
    let none = pipeline
        .list_my_reports(&Actor::reader(BOB), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn test_admin_queue_filters_by_status() {
    let h = harness();
    let pipeline = h.pipeline();
    let admin = Actor::admin(MODERATOR);
    let alice = Actor::reader(ALICE);

    let first = pipeline
        .create_report(&alice, report_of(ContentType::Chapter, CHAPTER, "spam"))
        .await
        .unwrap()
        .report
        .id;
    pipeline
        .create_report(&alice, report_of(ContentType::Novel, NOVEL, "spam"))
        .await
        .unwrap();
    pipeline
        .resolve_report(&admin, first, "RESOLVED", None)
        .await
        .unwrap();

    let open = pipeline
        .list_reports(&admin, Some(ReportStatus::InReview), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(open.total, 1);
    assert_eq!(open.items[0].report.content_type, ContentType::Novel);

    let all = pipeline
        .list_reports(&admin, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    let on_chapter = pipeline
        .list_content_reports(
            &admin,
            ReportTarget {
                content_type: ContentType::Chapter,
                content_id: CHAPTER,
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(on_chapter.total, 1);
    assert_eq!(on_chapter.items[0].report.status, ReportStatus::Resolved);

    let err = pipeline
        .list_reports(&alice, None, PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::Forbidden(_)));
}

#[tokio::test]
async fn test_reporter_may_withdraw() {
    let h = harness();
    let pipeline = h.pipeline();
    let alice = Actor::reader(ALICE);

    let id = pipeline
        .create_report(&alice, report_of(ContentType::Novel, NOVEL, "spam"))
        .await
        .unwrap()
        .report
        .id;
    assert!(pipeline.delete_report(&alice, id).await.unwrap());
    assert!(h.reports.is_empty());
}
