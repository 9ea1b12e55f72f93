// Message Tests - Testing Message, Conversation, User and Route helpers

use crate::store::message::TEMP_ID_PREFIX;
use crate::store::{Conversation, DeliveryStatus, Direction, Message, Route, User};
use crate::tests::fixtures::*;

#[test]
fn test_outgoing_message_is_pending_with_temp_id() {
    let me = user("me");
    let message = Message::outgoing("a", &me, "  hello  ", ts(0));

    assert!(message.id.starts_with(TEMP_ID_PREFIX));
    assert!(message.has_temp_id());
    assert_eq!(message.content, "hello");
    assert_eq!(message.direction, Direction::Sent);
    assert_eq!(message.delivery_status, DeliveryStatus::Pending);
    assert!(message.is_unconfirmed());

    let client_id = message.client_id.as_deref().expect("Should have client id");
    assert!(message.id.ends_with(client_id));
}

#[test]
fn test_outgoing_messages_get_distinct_ids() {
    let me = user("me");
    let a = Message::outgoing("a", &me, "hi", ts(0));
    let b = Message::outgoing("a", &me, "hi", ts(0));

    assert_ne!(a.id, b.id);
    assert_ne!(a.client_id, b.client_id);
}

#[test]
fn test_delivery_status_transitions() {
    let me = user("me");
    let mut message = Message::outgoing("a", &me, "hi", ts(0));
    assert_eq!(message.status_indicator(), "↻");

    message.mark_sent();
    assert!(message.is_transmitted());
    assert_eq!(message.status_indicator(), "✓");

    message.mark_pending();
    assert_eq!(message.delivery_status, DeliveryStatus::Pending);

    message.mark_failed();
    assert!(!message.is_unconfirmed());
    assert_eq!(message.status_indicator(), "✗");

    // Failed never goes back to sent
    message.mark_sent();
    assert_eq!(message.delivery_status, DeliveryStatus::Failed);
}

#[test]
fn test_status_indicator_for_confirmed_messages() {
    let me = user("me");
    let mut confirmed = echo("srv-1", "a", &me, "hi", None);
    assert_eq!(confirmed.status_indicator(), "✓");

    confirmed.mark_read();
    assert_eq!(confirmed.status_indicator(), "✓✓");

    let incoming = received("m1", "a", "hi", 0);
    assert_eq!(incoming.status_indicator(), "");
}

#[test]
fn test_server_message_deserialization() {
    let json = r#"{
        "id": "42",
        "user": {"id": "bob", "full_name": "Bob Stone"},
        "content": "hey",
        "created_at": "2024-03-01T10:00:00Z",
        "direction": "received",
        "room": "bob"
    }"#;
    let message: Message = serde_json::from_str(json).expect("Failed to deserialize");

    assert_eq!(message.id, "42");
    assert!(!message.is_read);
    assert!(message.client_id.is_none());
    assert_eq!(message.delivery_status, DeliveryStatus::Confirmed);
    assert!(!message.user.is_online);
}

#[test]
fn test_delivery_status_is_not_serialized() {
    let me = user("me");
    let message = Message::outgoing("a", &me, "hi", ts(0));
    let json = serde_json::to_string(&message).expect("Failed to serialize");

    assert!(!json.contains("delivery_status"));
    assert!(json.contains("client_id"));
}

#[test]
fn test_conversation_deserialization_defaults() {
    let json = r#"{"id": "bob", "friend": {"id": "bob", "full_name": "Bob", "is_online": true}}"#;
    let conv: Conversation = serde_json::from_str(json).expect("Failed to deserialize");

    assert!(conv.is_online());
    assert_eq!(conv.unread_count, 0);
    assert!(conv.last_message.is_none());
    assert!(conv.messages.is_empty());
}

#[test]
fn test_conversation_buffer_and_unread() {
    let mut conv = conversation("a");
    conv.push_message(received("m1", "a", "one", 1));
    conv.push_message(received("m2", "a", "two", 2));

    assert_eq!(conv.unread_count, 2);
    assert_eq!(conv.last_message.as_deref(), Some("two"));
    assert_eq!(conv.last_message_at, Some(ts(2)));

    conv.mark_read();
    assert_eq!(conv.unread_count, 0);
    assert_eq!(conv.messages.len(), 2);

    let taken = conv.take_messages();
    assert_eq!(taken.len(), 2);
    assert!(conv.messages.is_empty());
}

#[test]
fn test_conversation_from_message() {
    let conv = Conversation::from_message(&received("m1", "z", "hi", 5));

    assert_eq!(conv.id, "z");
    assert_eq!(conv.friend.id, "z");
    assert_eq!(conv.unread_count, 1);
    assert_eq!(conv.messages.len(), 1);
}

#[test]
fn test_user_presence_and_initials() {
    let mut user = User::new("1", "ada lovelace");
    assert_eq!(user.initials(), "AL");

    user.go_online();
    assert!(user.is_online);
    user.go_offline();
    assert!(!user.is_online);

    assert_eq!(User::new("2", "").initials(), "");
}

#[test]
fn test_route_parse() {
    assert_eq!(Route::parse("/"), Route::Elsewhere);
    assert_eq!(Route::parse("/profile/7"), Route::Elsewhere);
    assert_eq!(Route::parse("/messenger"), Route::Messenger);
    assert_eq!(Route::parse("/messenger/"), Route::Messenger);
    assert_eq!(Route::parse("/messenger/42"), Route::conversation("42"));
    assert_eq!(Route::parse("/messenger/42/?tab=x"), Route::conversation("42"));
}

#[test]
fn test_route_display_round_trips() {
    for route in [Route::Messenger, Route::conversation("42")] {
        assert_eq!(Route::parse(&route.to_string()), route);
    }
    assert_eq!(Route::conversation("42").room(), Some("42"));
    assert!(!Route::Elsewhere.is_messenger());
}
