//! # Reader Flow Demo
//!
//! One chapter, one novel, a few readers and a moderator, all backed by the
//! in-memory fakes. Shows the create pipeline, duplicate and self-target
//! rejections, best-effort side effects and report resolution.
//!
//! Run with `RUST_LOG=debug` to see every side effect.

use anyhow::Result;
use engage_core::{
    Actor, BroadcastPublisher, CommentInput, ContentType, Eligibility, PageRequest, ReportInput,
    ReportStatus, ReviewInput,
};
use engage_testing::TestHarness;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CHAPTER: i64 = 7;
const NOVEL: i64 = 3;

// ============================================================================
// World
// ============================================================================

fn seed(h: &TestHarness) {
    h.content.add_novel(NOVEL, "The Long Road", 99);
    h.content.add_chapter(CHAPTER, "Chapter 7: The Storm", 99);
    h.identity.add_user(1, "alice");
    h.identity.add_user(2, "bob");
    h.identity.add_user(99, "quill");
    h.identity.add_user(500, "mod");
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let h = TestHarness::new();
    seed(&h);

    let bus = Arc::new(BroadcastPublisher::new());
    let mut events = bus.subscribe();
    let listener = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("  [bus] {} key={}", event.channel, event.key);
        }
    });

    let pipeline = h.builder().with_events(bus.clone()).build();
    let alice = Actor::reader(1);
    let bob = Actor::reader(2);
    let author = Actor::reader(99);
    let moderator = Actor::admin(500);

    // Comments
    let comment = pipeline
        .create_comment(
            &alice,
            CHAPTER,
            CommentInput {
                content: "That cliffhanger!".into(),
                is_spoiler: false,
            },
        )
        .await?;
    println!(
        "{} commented on {:?}: {}",
        comment.user_name, comment.chapter_title, comment.comment.content
    );

    if let Err(e) = pipeline
        .create_comment(
            &alice,
            CHAPTER,
            CommentInput {
                content: "Again!".into(),
                is_spoiler: false,
            },
        )
        .await
    {
        println!("second comment rejected ({}): {e}", e.category());
    }

    pipeline.toggle_comment_like(comment.comment.id, true).await?;

    // Reviews and votes
    let review = pipeline
        .create_review(
            &bob,
            NOVEL,
            ReviewInput {
                rating: 4,
                title: "Slow start, great finish".into(),
                content: "Stick with it past chapter three.".into(),
                is_spoiler: false,
            },
        )
        .await?;
    println!("{} rated {:?} {}/5", review.user_name, review.novel_title, review.review.rating);

    pipeline.create_vote(&alice, NOVEL).await?;
    pipeline.create_vote(&bob, NOVEL).await?;
    if let Err(e) = pipeline.create_vote(&author, NOVEL).await {
        println!("author vote rejected: {e}");
    }

    h.rewards
        .set_eligibility(Eligibility::denied("Daily vote limit reached"));
    if let Err(e) = pipeline.create_vote(&alice, NOVEL).await {
        println!("alice's third vote rejected: {e}");
    }
    println!("votes for novel {NOVEL}: {}", pipeline.count_novel_votes(NOVEL).await?);

    // The reward service going down does not stop a comment from landing.
    h.rewards.set_credit_failing(true);
    pipeline
        .create_comment(
            &bob,
            CHAPTER,
            CommentInput {
                content: "Reward service is down and I am still here".into(),
                is_spoiler: false,
            },
        )
        .await?;
    h.rewards.set_credit_failing(false);

    let listing = pipeline
        .list_chapter_comments(Some(&bob), CHAPTER, PageRequest::default())
        .await?;
    for view in &listing.items {
        let own = if view.is_own_comment { " (yours)" } else { "" };
        println!("  - {}{own}: {}", view.user_name, view.comment.content);
    }

    // Moderation
    let report = pipeline
        .create_report(
            &bob,
            ReportInput {
                content_type: ContentType::Comment,
                content_id: comment.comment.id,
                reason: "Spoils the twist".into(),
            },
        )
        .await?;
    println!("report {} filed against {:?}", report.report.id, report.content_title);

    let queue = pipeline
        .list_reports(&moderator, Some(ReportStatus::InReview), PageRequest::default())
        .await?;
    println!("{} report(s) awaiting review", queue.total);

    let resolved = pipeline
        .resolve_report(
            &moderator,
            report.report.id,
            "RESOLVED",
            Some("Marked as spoiler".into()),
        )
        .await?;
    pipeline
        .bulk_set_comment_spoiler(&moderator, &[comment.comment.id], true)
        .await?;
    println!(
        "report {} is {} by {}",
        resolved.report.id,
        resolved.report.status,
        resolved.resolver_name.as_deref().unwrap_or("nobody")
    );

    pipeline.settle().await;
    println!("rewards granted: {}", h.rewards.grants().len());

    drop(pipeline);
    drop(bus);
    listener.await?;

    Ok(())
}
