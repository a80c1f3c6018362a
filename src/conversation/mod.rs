//! Per-user conversation windows and reply generation.

mod assistant;
mod message;
mod store;

pub use assistant::Assistant;
pub use message::{ChatMessage, Role};
pub use store::ConversationStore;
