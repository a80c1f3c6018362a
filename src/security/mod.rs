//! Webhook authenticity checks and inbound text hygiene.

mod sanitize;
mod signature;

pub use sanitize::{sanitize_message, validate_phone_number, MAX_MESSAGE_CHARS};
pub use signature::{
    generate_signature, verify, SignatureError, VerifiedToken, SIGNATURE_HEADER, SIGNATURE_PREFIX,
};
