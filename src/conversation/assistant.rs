//! Response generation on top of the conversation store.

use std::sync::Arc;
use tracing::{error, info, instrument};

use super::message::{ChatMessage, Role};
use super::store::ConversationStore;
use crate::config::OpenAiConfig;
use crate::openai::{ChatBackend, CompletionOptions};

const SUMMARY_PROMPT: &str = "Summarise the following conversation concisely:";
const SUMMARY_FALLBACK: &str = "Error generating summary";
const SUMMARY_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 200,
    temperature: 0.3,
};

/// Generates replies and keeps each user's conversation window.
pub struct Assistant {
    store: ConversationStore,
    backend: Arc<dyn ChatBackend>,
    options: CompletionOptions,
    fallback_reply: String,
}

impl Assistant {
    pub fn new(
        store: ConversationStore,
        backend: Arc<dyn ChatBackend>,
        options: CompletionOptions,
        fallback_reply: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            options,
            fallback_reply: fallback_reply.into(),
        }
    }

    /// Build an assistant from the `openai` configuration section.
    pub fn from_config(
        store: ConversationStore,
        backend: Arc<dyn ChatBackend>,
        config: &OpenAiConfig,
    ) -> Self {
        let options = CompletionOptions {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };
        Self::new(store, backend, options, config.fallback_reply.clone())
    }

    /// Reply to `user_message`. Returns the fallback reply if the backend fails.
    #[instrument(skip_all, fields(user = %user_id))]
    pub async fn generate_response(&self, user_message: &str, user_id: &str) -> String {
        let history = self.store.record_user(user_id, user_message);

        match self.backend.complete(&history, self.options).await {
            Ok(reply) => {
                self.store.record_assistant(user_id, &reply);
                info!(chars = reply.chars().count(), "Generated response");
                reply
            }
            Err(e) => {
                error!(error = %e, "Error generating response");
                self.fallback_reply.clone()
            }
        }
    }

    /// Summarise the user and assistant turns of `conversation`.
    pub async fn generate_summary(&self, conversation: &[ChatMessage]) -> String {
        let transcript = conversation
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let request = [ChatMessage::system(SUMMARY_PROMPT), ChatMessage::user(transcript)];

        match self.backend.complete(&request, SUMMARY_OPTIONS).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "Error generating summary");
                SUMMARY_FALLBACK.to_string()
            }
        }
    }

    pub fn conversation_history(&self, user_id: &str) -> Vec<ChatMessage> {
        self.store.history(user_id)
    }

    pub fn clear_conversation_history(&self, user_id: &str) -> bool {
        self.store.clear(user_id)
    }

    pub fn active_conversations(&self) -> usize {
        self.store.len()
    }
}
