use regex::Regex;
use std::sync::LazyLock;

/// Longest message text forwarded to the completion backend, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

static PHONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{9,14}$").expect("valid phone number pattern"));

/// Check that `phone_number` looks like an international number: an optional
/// `+`, no leading zero, 10 to 15 digits.
pub fn validate_phone_number(phone_number: &str) -> bool {
    PHONE_NUMBER.is_match(phone_number)
}

/// Strip control characters (keeping `\n`, `\r`, `\t`) and cap the length at
/// [`MAX_MESSAGE_CHARS`].
pub fn sanitize_message(message: &str) -> String {
    message
        .chars()
        .filter(|&c| c >= ' ' || matches!(c, '\n' | '\r' | '\t'))
        .take(MAX_MESSAGE_CHARS)
        .collect()
}
