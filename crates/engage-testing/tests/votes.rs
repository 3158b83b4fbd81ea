mod common;

use common::*;
use engage_core::{
    Actor, Eligibility, EngageError, PageRequest, RecordKind, VOTE_CHANNEL,
};

#[tokio::test]
async fn test_vote_for_someone_elses_novel() {
    let h = harness();
    let pipeline = h.pipeline();

    let view = pipeline
        .create_vote(&Actor::reader(ALICE), NOVEL)
        .await
        .unwrap();
    pipeline.settle().await;

    assert_eq!(view.vote.novel_id, NOVEL);
    assert_eq!(view.novel_title, "The Long Road");
    assert_eq!(view.user_name, "alice");
    assert_eq!(h.rewards.eligibility_checks(), 1);

    let grants = h.rewards.grants();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].action, RecordKind::Vote);
    assert_eq!(grants[0].experience, 2);
    assert_eq!(h.events.on_channel(VOTE_CHANNEL).len(), 1);
}

#[tokio::test]
async fn test_authors_cannot_vote_for_their_own_novel() {
    let h = harness();
    let pipeline = h.pipeline();

    let err = pipeline
        .create_vote(&Actor::reader(AUTHOR), NOVEL)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, EngageError::InvalidOperation(m) if m == "You cannot vote for your own novel")
    );
    assert_eq!(h.votes.insert_count(), 0);
    assert_eq!(h.rewards.eligibility_checks(), 0);
}

#[tokio::test]
async fn test_repeat_votes_are_allowed() {
    let h = harness();
    let pipeline = h.pipeline();
    let alice = Actor::reader(ALICE);

    pipeline.create_vote(&alice, NOVEL).await.unwrap();
    pipeline.create_vote(&alice, NOVEL).await.unwrap();

    assert_eq!(h.votes.len(), 2);
    assert_eq!(pipeline.count_novel_votes(NOVEL).await.unwrap(), 2);
}

#[tokio::test]
async fn test_denial_carries_the_gateway_reason() {
    let h = harness();
    h.rewards
        .set_eligibility(Eligibility::denied("Daily vote limit reached"));
    let pipeline = h.pipeline();

    let err = pipeline
        .create_vote(&Actor::reader(ALICE), NOVEL)
        .await
        .unwrap_err();

    assert!(matches!(&err, EngageError::InvalidOperation(m) if m == "Daily vote limit reached"));
    assert!(h.votes.is_empty());
}

#[tokio::test]
async fn test_denial_without_reason_uses_configured_message() {
    let h = harness();
    let pipeline = h.pipeline();
    let expected = pipeline.config().vote_denied_message.clone();

    for reason in [None, Some("   ".to_string())] {
        h.rewards.set_eligibility(Eligibility {
            allowed: false,
            reason,
        });
        let err = pipeline
            .create_vote(&Actor::reader(ALICE), NOVEL)
            .await
            .unwrap_err();
        assert!(matches!(&err, EngageError::InvalidOperation(m) if *m == expected));
    }
    assert!(h.votes.is_empty());
}

#[tokio::test]
async fn test_eligibility_outage_blocks_the_vote() {
    let h = harness();
    h.rewards.set_eligibility_failing(true);
    let pipeline = h.pipeline();

    let err = pipeline
        .create_vote(&Actor::reader(ALICE), NOVEL)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngageError::DependencyUnavailable {
            dependency: "reward gateway",
            ..
        }
    ));
    assert!(h.votes.is_empty());
}

#[tokio::test]
async fn test_missing_novel_is_not_found() {
    let h = harness();
    let pipeline = h.pipeline();

    let err = pipeline
        .create_vote(&Actor::reader(ALICE), 404)
        .await
        .unwrap_err();

    assert!(matches!(err, EngageError::NotFound { .. }));
    assert_eq!(h.rewards.eligibility_checks(), 0);
}

#[tokio::test]
async fn test_vote_counts_stay_fresh_across_creates() {
    let h = harness();
    let pipeline = h.pipeline();

    assert_eq!(pipeline.count_novel_votes(NOVEL).await.unwrap(), 0);
    pipeline
        .create_vote(&Actor::reader(ALICE), NOVEL)
        .await
        .unwrap();
    pipeline
        .create_vote(&Actor::reader(BOB), NOVEL)
        .await
        .unwrap();
    assert_eq!(pipeline.count_novel_votes(NOVEL).await.unwrap(), 2);

    let listed = pipeline
        .list_novel_votes(NOVEL, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.items[0].user_name, "bob");

    let alices = pipeline
        .list_user_votes(ALICE, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(alices.total, 1);
}

#[tokio::test]
async fn test_voter_may_withdraw_a_vote() {
    let h = harness();
    let pipeline = h.pipeline();

    let id = pipeline
        .create_vote(&Actor::reader(ALICE), NOVEL)
        .await
        .unwrap()
        .vote
        .id;

    let err = pipeline
        .delete_vote(&Actor::reader(BOB), id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::Forbidden(_)));

    assert!(pipeline.delete_vote(&Actor::reader(ALICE), id).await.unwrap());
    let err = pipeline.get_vote(id).await.unwrap_err();
    assert!(matches!(err, EngageError::NotFound { .. }));
}
