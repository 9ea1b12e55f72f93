// History Tests - Testing backfill merging and message identity

use crate::store::history::{
    MessageKey, SEEN_IDS_PER_ROOM, SeenIds, append_live, confirm_pending, contains, is_same_message,
    merge_backfill,
};
use crate::store::Message;
use crate::tests::fixtures::*;

fn ids(buffer: &[Message]) -> Vec<&str> {
    buffer.iter().map(|m| m.id.as_str()).collect()
}

/// A page as served: newest first
fn page(ids_and_secs: &[(&str, i64)]) -> Vec<Message> {
    ids_and_secs
        .iter()
        .map(|(id, secs)| received(id, "a", &format!("content {}", id), *secs))
        .collect()
}

#[test]
fn test_same_server_id_is_same_message() {
    let a = received("m1", "a", "hello", 1);
    let mut b = received("m1", "a", "edited", 9);
    b.is_read = true;

    assert!(is_same_message(&a, &b));
    assert!(!is_same_message(&a, &received("m2", "a", "hello", 1)));
}

#[test]
fn test_equal_content_alone_is_not_same_message() {
    let me = user("me");
    let mut first = echo("tmp-1", "a", &me, "ok", None);
    first.created_at = ts(10);
    let mut second = echo("tmp-2", "a", &me, "ok", None);
    second.created_at = ts(12);

    assert!(!is_same_message(&first, &second));
}

#[test]
fn test_temp_id_matches_by_composite_key() {
    let me = user("me");
    let mut optimistic = echo("tmp-1", "a", &me, "hi", None);
    optimistic.created_at = ts(10);
    let mut server = echo("srv-1", "a", &me, "hi", None);
    server.created_at = ts(10);

    assert!(is_same_message(&optimistic, &server));
    assert_eq!(MessageKey::of(&optimistic), MessageKey::composite(&server));
    assert_eq!(MessageKey::of(&server), MessageKey::Id("srv-1"));
}

#[test]
fn test_client_id_matches_across_ids() {
    let me = user("me");
    let optimistic = echo("tmp-1", "a", &me, "hi", Some("c-1"));
    let server = echo("srv-1", "a", &me, "hi", Some("c-1"));
    let other = echo("tmp-2", "a", &me, "hi", Some("c-2"));

    assert!(is_same_message(&optimistic, &server));
    assert!(!is_same_message(&optimistic, &other));
}

#[test]
fn test_merge_backfill_prepends_older_page() {
    let mut buffer = page(&[("m3", 30)]);
    let added = merge_backfill(&mut buffer, page(&[("m2", 20), ("m1", 10)]));

    assert_eq!(added, 2);
    assert_eq!(ids(&buffer), vec!["m1", "m2", "m3"]);
}

#[test]
fn test_merge_backfill_is_idempotent() {
    let mut buffer = Vec::new();
    merge_backfill(&mut buffer, page(&[("m3", 30), ("m2", 20), ("m1", 10)]));
    let once = buffer.clone();

    let added = merge_backfill(&mut buffer, page(&[("m3", 30), ("m2", 20), ("m1", 10)]));
    assert_eq!(added, 0);
    assert_eq!(buffer, once);
}

#[test]
fn test_merge_after_live_arrival_has_no_duplicates() {
    // Live first, then the page containing the same message
    let mut live_first = Vec::new();
    append_live(&mut live_first, page(&[("m3", 30)]));
    merge_backfill(&mut live_first, page(&[("m3", 30), ("m2", 20), ("m1", 10)]));

    // Page first, then the live copy
    let mut page_first = Vec::new();
    merge_backfill(&mut page_first, page(&[("m3", 30), ("m2", 20), ("m1", 10)]));
    append_live(&mut page_first, page(&[("m3", 30)]));

    assert_eq!(ids(&live_first), vec!["m1", "m2", "m3"]);
    assert_eq!(live_first, page_first);
}

#[test]
fn test_merge_backfill_sorts_across_the_seam() {
    // A live message older than the newest backfilled one
    let mut buffer = page(&[("live", 15)]);
    merge_backfill(&mut buffer, page(&[("m2", 20), ("m1", 10)]));

    assert_eq!(ids(&buffer), vec!["m1", "live", "m2"]);
}

#[test]
fn test_merge_backfill_skips_duplicates_inside_page() {
    let mut buffer = Vec::new();
    let added = merge_backfill(&mut buffer, page(&[("m2", 20), ("m2", 20), ("m1", 10)]));

    assert_eq!(added, 2);
    assert_eq!(ids(&buffer), vec!["m1", "m2"]);
}

#[test]
fn test_append_live_keeps_arrival_order() {
    let mut buffer = Vec::new();
    let added = append_live(&mut buffer, page(&[("late", 50), ("early", 5), ("late", 50)]));

    assert_eq!(added, 2);
    assert_eq!(ids(&buffer), vec!["late", "early"]);
    assert!(contains(&buffer, &received("early", "a", "x", 0)));
}

#[test]
fn test_confirm_replaces_pending_copy() {
    let me = user("me");
    let pending = Message::outgoing("bob", &me, "yo", ts(10));
    let client_id = pending.client_id.clone().expect("Should carry a client id");
    let mut buffer = vec![received("m0", "bob", "hi", 5), pending];

    let server = echo("s1", "bob", &me, "yo", None);
    assert!(confirm_pending(&mut buffer, &client_id, &server));

    assert_eq!(ids(&buffer), vec!["m0", "s1"]);
    assert_eq!(buffer[1].client_id.as_deref(), Some(client_id.as_str()));
    assert!(!confirm_pending(&mut buffer, "unknown", &server));
}

#[test]
fn test_confirm_after_backfill_keeps_one_server_copy() {
    let me = user("me");
    let pending = Message::outgoing("bob", &me, "yo", ts(10));
    let client_id = pending.client_id.clone().expect("Should carry a client id");
    let mut buffer = vec![pending];

    // The history page carries the server copy with the server's timestamp
    let mut server = echo("s1", "bob", &me, "yo", None);
    server.created_at = ts(11);
    assert_eq!(merge_backfill(&mut buffer, vec![server.clone()]), 1);
    assert_eq!(buffer.len(), 2);

    assert!(confirm_pending(&mut buffer, &client_id, &server));
    assert_eq!(ids(&buffer), vec!["s1"]);

    // Re-applying the page changes nothing
    assert_eq!(merge_backfill(&mut buffer, vec![server]), 0);
    assert_eq!(ids(&buffer), vec!["s1"]);
}

#[test]
fn test_seen_ids_per_room() {
    let mut seen = SeenIds::new();

    assert!(seen.record("a", "m1"));
    assert!(!seen.record("a", "m1"));
    assert!(seen.contains("a", "m1"));
    assert!(!seen.contains("b", "m1"));
}

#[test]
fn test_seen_ids_are_bounded() {
    let mut seen = SeenIds::new();
    for i in 0..=SEEN_IDS_PER_ROOM {
        seen.record("a", &format!("m{}", i));
    }

    assert!(!seen.contains("a", "m0"));
    assert!(seen.contains("a", "m1"));
    assert!(seen.contains("a", &format!("m{}", SEEN_IDS_PER_ROOM)));
}
