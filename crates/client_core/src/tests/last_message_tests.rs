use shared::domain::{MessageType, UserId};

use super::*;
use crate::test_support::{deleted, message};

fn id(message: Option<&Message>) -> Option<&str> {
    message.map(|m| m.id.as_str())
}

#[test]
fn empty_sequence_has_no_last_message() {
    assert!(resolve(&[]).is_none());
    assert!(resolve_excluding_user(&[], &UserId::from("u1")).is_none());
}

#[test]
fn returns_the_regular_tail() {
    let messages = vec![message("m1", "u1", 10), message("m2", "u2", 20)];
    assert_eq!(id(resolve(&messages)), Some("m2"));
}

#[test]
fn deleted_tail_falls_back_to_previous_message() {
    let messages = vec![
        message("m1", "u1", 10),
        message("m2", "u2", 20),
        deleted(message("m3", "u2", 30), 40),
    ];
    assert_eq!(id(resolve(&messages)), Some("m2"));

    let all_deleted = vec![deleted(message("m1", "u1", 10), 11)];
    assert!(resolve(&all_deleted).is_none());
}

#[test]
fn skips_non_regular_messages() {
    let mut system = message("m2", "u1", 20);
    system.message_type = MessageType::System;
    let mut ephemeral = message("m3", "u1", 30);
    ephemeral.message_type = MessageType::Ephemeral;
    let mut error = message("m4", "u1", 40);
    error.message_type = MessageType::Error;

    let messages = vec![message("m1", "u2", 10), system, ephemeral, error];
    assert_eq!(id(resolve(&messages)), Some("m1"));
}

#[test]
fn excluding_user_skips_own_messages() {
    let messages = vec![
        message("m1", "u2", 10),
        deleted(message("m2", "u3", 20), 25),
        message("m3", "me", 30),
    ];
    let me = UserId::from("me");
    assert_eq!(id(resolve_excluding_user(&messages, &me)), Some("m1"));
    assert_eq!(id(resolve(&messages)), Some("m3"));
}
