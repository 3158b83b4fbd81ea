#![allow(dead_code)]

use engage_core::{CommentInput, ReviewInput, UserId};
use engage_testing::TestHarness;

pub const ALICE: UserId = 1;
pub const BOB: UserId = 2;
pub const AUTHOR: UserId = 99;
pub const MODERATOR: UserId = 500;

pub const CHAPTER: i64 = 7;
pub const NOVEL: i64 = 3;

/// A harness with one chapter, one novel and a few named users.
pub fn harness() -> TestHarness {
    let h = TestHarness::new();
    seed(&h);
    h
}

pub fn seed(h: &TestHarness) {
    h.content.add_chapter(CHAPTER, "Chapter 7: The Storm", AUTHOR);
    h.content.add_novel(NOVEL, "The Long Road", AUTHOR);
    h.identity.add_user(ALICE, "alice");
    h.identity.add_user(BOB, "bob");
    h.identity.add_user(AUTHOR, "quill");
    h.identity.add_user(MODERATOR, "mod");
}

pub fn comment(text: &str) -> CommentInput {
    CommentInput {
        content: text.to_string(),
        is_spoiler: false,
    }
}

pub fn review(rating: i16, title: &str) -> ReviewInput {
    ReviewInput {
        rating,
        title: title.to_string(),
        content: "Steady pacing and a great ending.".to_string(),
        is_spoiler: false,
    }
}
