//! Chatrelay - WhatsApp to chat-completion relay
//!
//! Receives WhatsApp Cloud API webhook deliveries, authenticates them with an
//! HMAC-SHA256 signature, throttles each sender with a sliding-window limiter
//! and answers through a chat-completion backend that keeps a bounded
//! per-user conversation window.

pub mod config;
pub mod conversation;
pub mod error;
pub mod openai;
pub mod ratelimit;
pub mod security;
pub mod server;
pub mod whatsapp;
