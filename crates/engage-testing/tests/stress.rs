//! Concurrency: many callers sharing one pipeline.

mod common;

use common::*;
use engage_core::Actor;
use std::collections::HashSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_are_never_lost() {
    let h = harness();
    let pipeline = h.pipeline();
    let id = pipeline
        .create_comment(&Actor::reader(ALICE), CHAPTER, comment("popular"))
        .await
        .unwrap()
        .comment
        .id;

    let per_task: Vec<usize> = (0..16).map(|_| fastrand::usize(1..40)).collect();
    let expected: usize = per_task.iter().sum();

    let likes: Vec<_> = per_task
        .iter()
        .map(|&n| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                for _ in 0..n {
                    pipeline.toggle_comment_like(id, true).await.unwrap();
                    if fastrand::bool() {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for task in likes {
        task.await.unwrap();
    }
    assert_eq!(h.comments.get(id).unwrap().like_count, expected as i64);

    let unlikes: Vec<_> = per_task
        .iter()
        .map(|&n| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                for _ in 0..n {
                    pipeline.toggle_comment_like(id, false).await.unwrap();
                }
            })
        })
        .collect();
    for task in unlikes {
        task.await.unwrap();
    }
    assert_eq!(h.comments.get(id).unwrap().like_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_each_get_one_comment() {
    let h = harness();
    let pipeline = h.pipeline();
    let readers: Vec<i64> = (1000..1032).collect();

    let tasks: Vec<_> = readers
        .iter()
        .map(|&user| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .create_comment(&Actor::reader(user), CHAPTER, comment("me too"))
                    .await
                    .map(|view| view.comment.id)
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap().unwrap());
    }
    pipeline.settle().await;

    assert_eq!(ids.len(), readers.len());
    assert_eq!(h.comments.len(), readers.len());
    assert_eq!(h.rewards.grants().len(), readers.len());
    assert_eq!(pipeline.inflight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_duplicates_with_a_unique_index_keep_one_row() {
    let h = engage_testing::TestHarness::with_unique_indexes();
    seed(&h);
    h.content
        .set_latency(Some(std::time::Duration::from_millis(20)));
    let pipeline = h.pipeline();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .create_comment(&Actor::reader(ALICE), CHAPTER, comment(&format!("try {i}")))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert!(
                matches!(err, engage_core::EngageError::DuplicateRecord(_)),
                "{err:?}"
            ),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(h.comments.len(), 1);
}
