//! WhatsApp Cloud API: webhook payloads and the outbound send client.

mod client;
pub mod models;

pub use client::WhatsAppClient;
pub use models::{Message, WebhookEvent, WebhookVerification};

use async_trait::async_trait;

/// Default language for template messages.
pub const DEFAULT_TEMPLATE_LANGUAGE: &str = "es";

/// Outbound side of the messaging platform.
///
/// Implemented by [`WhatsAppClient`]; handler tests substitute their own.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message to `to`. Returns whether the platform accepted it.
    async fn send_message(&self, to: &str, body: &str) -> bool;

    /// Mark an inbound message as read. Returns whether the platform accepted it.
    async fn mark_message_as_read(&self, message_id: &str) -> bool;
}
