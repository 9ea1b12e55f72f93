// Store Tests Module - Testing the chat state store
// Tests organized by store functionality:
// - chat_state_tests: ChatState reducer (lists, presence, typing, messages, reads)
// - windows_tests: WindowManager (active/minimized capacity, exclusivity, history)
// - notifications_tests: NotificationQueue (cap, dedup, expiry, route suppression)
// - history_tests: History merge (dedup keys, backfill, idempotence, ordering)
// - message_tests: Message, Conversation, User and Route helpers

mod history_tests;
mod message_tests;
mod windows_tests;
