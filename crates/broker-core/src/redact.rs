//! Contact redaction for participant-authored free text.
//!
//! Descriptions and offer comments travel to the counterparty before any deal
//! exists, so phone numbers, `@handles` and links are replaced with
//! [`REDACTED_PLACEHOLDER`] at write time. The one-time contact release after a
//! deal is composed by the bot itself and never passes through here.

use std::sync::LazyLock;

use regex::Regex;

/// Replacement for every hidden contact.
pub const REDACTED_PLACEHOLDER: &str = "[[hidden]]";

/// Phone: 7+ digits, optionally separated by spaces or hyphens, optional leading `+`.
/// Handle: `@` plus 3+ word characters. Links: `http(s)://…` and `t.me/…`.
static CONTACT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\+?\d(?:[\s-]*\d){6,}|@\w{3,}|https?://\S+|t\.me/\S+")
        .expect("contact pattern is a valid regex")
});

/// Replace every contact-like substring with [`REDACTED_PLACEHOLDER`].
///
/// Total and idempotent: the placeholder itself never matches.
pub fn redact(text: &str) -> String {
    CONTACT_PATTERN
        .replace_all(text, REDACTED_PLACEHOLDER)
        .into_owned()
}
