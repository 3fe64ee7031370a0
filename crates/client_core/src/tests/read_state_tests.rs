use shared::domain::UserId;

use super::*;
use crate::test_support::{at, message, read, user};

fn order(reads: &[ChannelUserRead]) -> Vec<&str> {
    reads.iter().map(|r| r.user.id.as_str()).collect()
}

#[test]
fn repeated_upserts_leave_one_entry_with_the_last_timestamp() {
    let mut tracker = ReadStateTracker::new();
    for seconds in [10, 20, 30, 40] {
        tracker.upsert(user("u1"), at(seconds));
    }

    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.last_read_for(&UserId::from("u1")), Some(at(40)));
}

#[test]
fn upsert_moves_the_entry_to_the_end() {
    let mut tracker = ReadStateTracker::from_reads(vec![read("u1", 10), read("u2", 20)]);
    tracker.upsert(user("u1"), at(30));

    assert_eq!(order(tracker.all()), ["u2", "u1"]);
}

#[test]
fn unknown_user_has_no_marker() {
    let tracker = ReadStateTracker::from_reads(vec![read("u1", 10)]);
    assert_eq!(tracker.last_read_for(&UserId::from("nobody")), None);
}

#[test]
fn sorted_view_breaks_ties_by_insertion_order() {
    let tracker =
        ReadStateTracker::from_reads(vec![read("u3", 30), read("u1", 10), read("u2", 10)]);
    assert_eq!(order(&tracker.sorted_ascending()), ["u1", "u2", "u3"]);
}

#[test]
fn replace_all_collapses_duplicates() {
    let mut tracker = ReadStateTracker::from_reads(vec![read("old", 5)]);
    tracker.replace_all(vec![read("u1", 10), read("u2", 20), read("u1", 30)]);

    assert_eq!(order(tracker.all()), ["u2", "u1"]);
    assert_eq!(tracker.last_read_for(&UserId::from("u1")), Some(at(30)));
    assert!(tracker.last_read_for(&UserId::from("old")).is_none());
}

#[test]
fn last_reader_ignores_the_given_user() {
    let tracker =
        ReadStateTracker::from_reads(vec![read("u2", 10), read("u3", 20), read("me", 99)]);
    let reader = tracker.last_reader_excluding(&UserId::from("me"));
    assert_eq!(reader.map(|u| u.id.as_str()), Some("u3"));

    let only_me = ReadStateTracker::from_reads(vec![read("me", 10)]);
    assert!(only_me
        .last_reader_excluding(&UserId::from("me"))
        .is_none());
}

#[test]
fn last_message_reads_lists_covering_readers_oldest_first() {
    let tracker = ReadStateTracker::from_reads(vec![
        read("u4", 40),
        read("u2", 5),
        read("me", 50),
        read("u3", 20),
    ]);
    let last = message("m1", "u2", 20);

    let seen_by = tracker.last_message_reads(Some(&last), &UserId::from("me"));
    assert_eq!(order(&seen_by), ["u3", "u4"]);
    assert!(tracker
        .last_message_reads(None, &UserId::from("me"))
        .is_empty());
}

#[test]
fn has_read_compares_against_message_creation() {
    let tracker = ReadStateTracker::from_reads(vec![read("u1", 20)]);
    let u1 = UserId::from("u1");

    assert!(tracker.has_read(&u1, Some(&message("m1", "u2", 10))));
    assert!(!tracker.has_read(&u1, Some(&message("m2", "u2", 20))));
    assert!(tracker.has_read(&u1, None));
    assert!(!tracker.has_read(&UserId::from("u9"), None));
}
