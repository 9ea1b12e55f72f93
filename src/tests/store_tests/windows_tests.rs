// Windows Tests - Testing the active/minimized chat window policy

use crate::store::windows::{ACTIVE_CAPACITY, MINIMIZED_CAPACITY, WindowManager};
use crate::tests::fixtures::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn active_rooms(windows: &WindowManager) -> Vec<String> {
    windows.active().iter().map(|w| w.room().to_string()).collect()
}

fn minimized_rooms(windows: &WindowManager) -> Vec<String> {
    windows.minimized().iter().map(|w| w.room().to_string()).collect()
}

fn open_all(windows: &mut WindowManager, rooms: &[&str]) {
    for room in rooms {
        windows.open(conversation(room));
    }
}

#[test]
fn test_open_creates_expanded_window() {
    let mut windows = WindowManager::new();
    windows.open(conversation("a"));

    assert_eq!(active_rooms(&windows), vec!["a"]);
    let window = windows.window("a").expect("Window should exist");
    assert!(window.opened);
    assert_eq!(window.new_messages, 0);
    assert_eq!(windows.chats().len(), 1);
}

#[test]
fn test_fourth_open_minimizes_oldest() {
    let mut windows = WindowManager::new();
    open_all(&mut windows, &["a", "b", "c"]);
    assert_eq!(active_rooms(&windows), vec!["c", "b", "a"]);

    windows.open(conversation("d"));
    assert_eq!(active_rooms(&windows), vec!["d", "c", "b"]);
    assert_eq!(minimized_rooms(&windows), vec!["a"]);
}

#[test]
fn test_minimized_overflow_drops_tail() {
    let mut windows = WindowManager::new();
    open_all(&mut windows, &["a", "b", "c", "d", "e", "f", "g"]);

    assert_eq!(active_rooms(&windows), vec!["g", "f", "e"]);
    assert_eq!(minimized_rooms(&windows), vec!["d", "c", "b"]);
    // Dropped from both sets, still in history
    assert!(!windows.is_active("a"));
    assert!(!windows.is_minimized("a"));
    assert!(windows.window("a").is_some());
    assert_eq!(windows.chats().len(), 7);
}

#[test]
fn test_open_active_window_expands_without_reordering() {
    let mut windows = WindowManager::new();
    open_all(&mut windows, &["a", "b"]);
    windows.toggle("a");
    assert!(!windows.window("a").expect("Window should exist").opened);

    windows.open(conversation("a"));
    assert!(windows.window("a").expect("Window should exist").opened);
    assert_eq!(active_rooms(&windows), vec!["b", "a"]);
}

#[test]
fn test_open_minimized_window_moves_it_back() {
    let mut windows = WindowManager::new();
    open_all(&mut windows, &["a", "b", "c", "d"]);
    assert!(windows.is_minimized("a"));

    windows.open(conversation("a"));
    assert_eq!(active_rooms(&windows), vec!["a", "d", "c"]);
    assert_eq!(minimized_rooms(&windows), vec!["b"]);
}

#[test]
fn test_reopen_closed_window_keeps_buffer() {
    let mut windows = WindowManager::new();
    windows.open(conversation("a"));
    windows.add_message(received("m1", "a", "hi", 1));
    windows.close("a");
    assert!(windows.active().is_empty());

    windows.open(online_conversation("a"));
    let window = windows.window("a").expect("Window should exist");
    assert_eq!(window.messages.len(), 1);
    assert!(window.conversation.is_online());
    assert_eq!(windows.chats().len(), 1);
}

#[test]
fn test_minimize_and_restore() {
    let mut windows = WindowManager::new();
    open_all(&mut windows, &["a", "b"]);

    windows.minimize("a");
    assert_eq!(active_rooms(&windows), vec!["b"]);
    assert_eq!(minimized_rooms(&windows), vec!["a"]);

    // Minimizing something not active does nothing
    windows.minimize("a");
    windows.minimize("zzz");
    assert_eq!(minimized_rooms(&windows), vec!["a"]);

    windows.restore("a");
    assert_eq!(active_rooms(&windows), vec!["a", "b"]);
    assert!(minimized_rooms(&windows).is_empty());
}

#[test]
fn test_restore_overflows_active() {
    let mut windows = WindowManager::new();
    open_all(&mut windows, &["a", "b", "c", "d"]);

    windows.restore("a");
    assert_eq!(active_rooms(&windows), vec!["a", "d", "c"]);
    assert_eq!(minimized_rooms(&windows), vec!["b"]);
}

#[test]
fn test_close_keeps_history() {
    let mut windows = WindowManager::new();
    open_all(&mut windows, &["a", "b", "c", "d"]);

    windows.close("d");
    windows.close("a");
    assert_eq!(active_rooms(&windows), vec!["c", "b"]);
    assert!(minimized_rooms(&windows).is_empty());
    assert_eq!(windows.chats().len(), 4);
}

#[test]
fn test_toggle_resets_new_messages_on_expand() {
    let mut windows = WindowManager::new();
    windows.open(conversation("a"));
    windows.toggle("a");

    windows.add_message(received("m1", "a", "one", 1));
    windows.add_message(received("m2", "a", "two", 2));
    assert_eq!(windows.window("a").expect("Window should exist").new_messages, 2);

    windows.toggle("a");
    let window = windows.window("a").expect("Window should exist");
    assert!(window.opened);
    assert_eq!(window.new_messages, 0);
    assert_eq!(window.messages.len(), 2);
}

#[test]
fn test_add_message_counts_minimized_as_new() {
    let mut windows = WindowManager::new();
    open_all(&mut windows, &["a", "b"]);
    windows.minimize("a");

    assert!(windows.add_message(received("m1", "a", "hi", 1)));
    assert!(windows.add_message(received("m2", "b", "hi", 1)));
    assert!(!windows.add_message(received("m3", "nobody", "hi", 1)));

    assert_eq!(windows.window("a").expect("Window should exist").new_messages, 1);
    assert_eq!(windows.window("b").expect("Window should exist").new_messages, 0);
}

#[test]
fn test_random_operations_keep_window_invariants() {
    let rooms = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let mut rng = StdRng::seed_from_u64(7);
    let mut windows = WindowManager::new();
    let mut seen = std::collections::HashSet::new();

    for _ in 0..2_000 {
        let room = rooms[rng.gen_range(0..rooms.len())];
        match rng.gen_range(0..5) {
            0 | 1 => {
                windows.open(conversation(room));
                seen.insert(room);
            }
            2 => windows.minimize(room),
            3 => windows.restore(room),
            _ => windows.close(room),
        }

        let active = active_rooms(&windows);
        let minimized = minimized_rooms(&windows);
        assert!(active.len() <= ACTIVE_CAPACITY);
        assert!(minimized.len() <= MINIMIZED_CAPACITY);
        assert!(active.iter().all(|r| !minimized.contains(r)));
        // Every window ever opened stays in history
        assert!(seen.iter().all(|r| windows.window(r).is_some()));
        assert_eq!(windows.chats().len(), seen.len());
    }
}

#[test]
fn test_add_message_skips_message_already_shown() {
    let mut windows = WindowManager::new();
    windows.open(conversation("bob"));
    windows.toggle("bob");

    assert!(windows.add_message(received("m1", "bob", "hi", 10)));
    assert!(!windows.add_message(received("m1", "bob", "hi", 10)));

    let window = windows.window("bob").expect("Window should exist");
    assert_eq!(window.messages.len(), 1);
    assert_eq!(window.new_messages, 1);
}

#[test]
fn test_confirm_message_after_server_copy_arrived() {
    let me = user("me");
    let mut windows = WindowManager::new();
    windows.open(conversation("bob"));
    let pending = crate::store::Message::outgoing("bob", &me, "yo", ts(10));
    let client_id = pending.client_id.clone().expect("Should carry a client id");
    windows.add_message(pending);

    let server = echo("s1", "bob", &me, "yo", None);
    windows.add_message(server.clone());
    assert!(windows.confirm_message(&client_id, &server));

    let window = windows.window("bob").expect("Window should exist");
    let ids: Vec<&str> = window.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["s1"]);
}
