//! Rolling per-user conversation windows.

use dashmap::DashMap;
use tracing::{debug, info};

use super::message::ChatMessage;
use crate::config::ConversationConfig;

/// In-memory conversation histories, one per user.
///
/// Every history starts with the system prompt. Once a history grows past
/// `max_messages`, it is cut back to the system prompt plus the
/// `keep_recent` newest messages.
pub struct ConversationStore {
    histories: DashMap<String, Vec<ChatMessage>>,
    system_prompt: String,
    max_messages: usize,
    keep_recent: usize,
}

impl ConversationStore {
    pub fn new(system_prompt: impl Into<String>, max_messages: usize, keep_recent: usize) -> Self {
        Self {
            histories: DashMap::new(),
            system_prompt: system_prompt.into(),
            max_messages,
            keep_recent,
        }
    }

    pub fn from_config(system_prompt: impl Into<String>, config: &ConversationConfig) -> Self {
        Self::new(system_prompt, config.max_messages, config.keep_recent)
    }

    /// Append a user turn, trim the window, and return the history to send
    /// to the backend.
    pub fn record_user(&self, user_id: &str, content: &str) -> Vec<ChatMessage> {
        let mut history = self
            .histories
            .entry(user_id.to_owned())
            .or_insert_with(|| {
                debug!(user = %user_id, "Starting new conversation");
                vec![ChatMessage::system(self.system_prompt.clone())]
            });

        history.push(ChatMessage::user(content));

        if history.len() > self.max_messages {
            let start = history.len().saturating_sub(self.keep_recent).max(1);
            history.drain(1..start);
            debug!(user = %user_id, kept = history.len(), "Trimmed conversation history");
        }

        history.clone()
    }

    /// Append an assistant turn.
    pub fn record_assistant(&self, user_id: &str, content: &str) {
        if let Some(mut history) = self.histories.get_mut(user_id) {
            history.push(ChatMessage::assistant(content));
        }
    }

    /// History for `user_id`, empty if none exists.
    pub fn history(&self, user_id: &str) -> Vec<ChatMessage> {
        self.histories
            .get(user_id)
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Forget a user's conversation. Returns whether one existed.
    pub fn clear(&self, user_id: &str) -> bool {
        let removed = self.histories.remove(user_id).is_some();
        if removed {
            info!(user = %user_id, "Cleared conversation history");
        }
        removed
    }

    /// Number of active conversations.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    fn contents(history: &[ChatMessage]) -> Vec<&str> {
        history.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_first_message_seeds_system_prompt() {
        let store = ConversationStore::new("sys", 10, 8);
        let history = store.record_user("u1", "hi");

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[0].content, "sys");
        assert_eq!(history[1].role, Role::User);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_trim_keeps_system_and_last_eight() {
        let store = ConversationStore::new("sys", 10, 8);

        // system + 9 user turns = 10 messages, not yet over the cap
        for i in 0..9 {
            store.record_user("u1", &format!("m{}", i));
        }
        assert_eq!(store.history("u1").len(), 10);

        // the 11th message triggers the trim down to 1 + 8
        let history = store.record_user("u1", "m9");
        assert_eq!(history.len(), 9);
        assert_eq!(
            contents(&history),
            vec!["sys", "m2", "m3", "m4", "m5", "m6", "m7", "m8", "m9"]
        );
    }

    #[test]
    fn test_assistant_turn_can_exceed_cap_until_next_user_turn() {
        let store = ConversationStore::new("sys", 4, 2);

        store.record_user("u1", "q1");
        store.record_assistant("u1", "a1");
        store.record_user("u1", "q2");
        store.record_assistant("u1", "a2");
        assert_eq!(store.history("u1").len(), 5);

        let history = store.record_user("u1", "q3");
        assert_eq!(contents(&history), vec!["sys", "a2", "q3"]);
    }

    #[test]
    fn test_keep_recent_larger_than_history() {
        let store = ConversationStore::new("sys", 2, 50);
        store.record_user("u1", "a");
        let history = store.record_user("u1", "b");
        assert_eq!(contents(&history), vec!["sys", "a", "b"]);
    }

    #[test]
    fn test_assistant_without_history_is_ignored() {
        let store = ConversationStore::new("sys", 10, 8);
        store.record_assistant("ghost", "hello");
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear() {
        let store = ConversationStore::new("sys", 10, 8);
        store.record_user("u1", "hi");
        store.record_user("u2", "hi");

        assert!(store.clear("u1"));
        assert!(!store.clear("u1"));
        assert!(store.history("u1").is_empty());
        assert_eq!(store.len(), 1);
    }
}
