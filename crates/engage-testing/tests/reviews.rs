mod common;

use common::*;
use engage_core::{Actor, EngageError, PageRequest, ReviewPatch, REVIEW_CHANNEL};

#[tokio::test]
async fn test_create_review_credits_and_announces() {
    let h = harness();
    let pipeline = h.pipeline();

    let view = pipeline
        .create_review(&Actor::reader(ALICE), NOVEL, review(4, "Worth it"))
        .await
        .unwrap();
    pipeline.settle().await;

    assert_eq!(view.review.rating, 4);
    assert_eq!(view.novel_title, "The Long Road");
    assert_eq!(view.user_name, "alice");
    assert!(view.is_own_review);

    let grants = h.rewards.grants();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].experience, 10);

    let events = h.events.on_channel(REVIEW_CHANNEL);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, view.review.id.to_string());
    assert_eq!(events[0].payload["event"]["rating"], 4);
}

#[tokio::test]
async fn test_one_review_per_reader_and_novel() {
    let h = harness();
    let pipeline = h.pipeline();
    let alice = Actor::reader(ALICE);

    pipeline
        .create_review(&alice, NOVEL, review(5, "Loved it"))
        .await
        .unwrap();
    let err = pipeline
        .create_review(&alice, NOVEL, review(1, "Changed my mind"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngageError::DuplicateRecord(_)));
    assert_eq!(h.reviews.len(), 1);
    assert_eq!(h.reviews.all()[0].rating, 5);
}

#[tokio::test]
async fn test_rating_and_text_are_validated_before_any_lookup() {
    let h = harness();
    let pipeline = h.pipeline();
    let alice = Actor::reader(ALICE);

    for input in [review(0, "Zero"), review(6, "Six"), review(3, "  ")] {
        let err = pipeline
            .create_review(&alice, NOVEL, input)
            .await
            .unwrap_err();
        assert!(matches!(err, EngageError::Validation(_)), "{err:?}");
    }
    assert_eq!(h.content.calls(), 0);
    assert!(h.reviews.is_empty());
}

#[tokio::test]
async fn test_missing_novel_is_not_found() {
    let h = harness();
    let pipeline = h.pipeline();

    let err = pipeline
        .create_review(&Actor::reader(ALICE), 404, review(3, "Where is it"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngageError::NotFound { .. }));
    assert_eq!(h.reviews.insert_count(), 0);
}

#[tokio::test]
async fn test_partial_update_changes_rating_only() {
    let h = harness();
    let pipeline = h.pipeline();
    let alice = Actor::reader(ALICE);

    let created = pipeline
        .create_review(&alice, NOVEL, review(3, "Fine"))
        .await
        .unwrap();
    let id = created.review.id;

    let view = pipeline
        .update_review(
            &alice,
            id,
            ReviewPatch {
                rating: Some(5),
                title: Some("Fine".into()),
                ..ReviewPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(view.review.rating, 5);
    assert_eq!(view.review.title, "Fine");
    assert_eq!(view.review.content, created.review.content);
    assert_eq!(h.reviews.get(id).unwrap().rating, 5);

    let err = pipeline
        .update_review(
            &alice,
            id,
            ReviewPatch {
                rating: Some(9),
                ..ReviewPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::Validation(_)));
    assert_eq!(h.reviews.get(id).unwrap().rating, 5);
}

#[tokio::test]
async fn test_empty_patch_is_a_no_op() {
    let h = harness();
    let pipeline = h.pipeline();
    let alice = Actor::reader(ALICE);

    let created = pipeline
        .create_review(&alice, NOVEL, review(3, "Fine"))
        .await
        .unwrap();
    let writes = h.reviews.write_count();

    let view = pipeline
        .update_review(&alice, created.review.id, ReviewPatch::default())
        .await
        .unwrap();

    assert_eq!(h.reviews.write_count(), writes);
    assert_eq!(view.review, created.review);
}

#[tokio::test]
async fn test_review_likes_round_trip() {
    let h = harness();
    let pipeline = h.pipeline();

    let id = pipeline
        .create_review(&Actor::reader(ALICE), NOVEL, review(4, "Good"))
        .await
        .unwrap()
        .review
        .id;

    for _ in 0..3 {
        pipeline.toggle_review_like(id, true).await.unwrap();
    }
    pipeline.toggle_review_like(id, false).await.unwrap();
    assert_eq!(h.reviews.get(id).unwrap().like_count, 2);
}

#[tokio::test]
async fn test_listings_by_novel_and_by_user() {
    let h = harness();
    let pipeline = h.pipeline();

    pipeline
        .create_review(&Actor::reader(ALICE), NOVEL, review(4, "Good"))
        .await
        .unwrap();
    pipeline
        .create_review(&Actor::reader(BOB), NOVEL, review(2, "Slow"))
        .await
        .unwrap();

    let bob = Actor::reader(BOB);
    let by_novel = pipeline
        .list_novel_reviews(Some(&bob), NOVEL, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_novel.total, 2);
    assert_eq!(by_novel.items[0].review.user_id, BOB);
    assert!(by_novel.items[0].is_own_review);
    assert!(!by_novel.items[1].is_own_review);

    let by_alice = pipeline
        .list_user_reviews(None, ALICE, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_alice.total, 1);
    assert_eq!(by_alice.items[0].novel_title, "The Long Road");
}
