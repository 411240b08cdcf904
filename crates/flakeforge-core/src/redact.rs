//! Redaction of diagnostic text
//!
//! Errors carry full diagnostic detail (paths, captured process output, system
//! error text) in their `Display` output. Where that text must not leave the
//! machine, callers use [`Redact::redacted`] instead, which keeps only the
//! operation being performed and the identity of the thing it was performed on.

use regex::Regex;
use std::sync::LazyLock;

/// Placeholder substituted for removed text
pub const REDACTED: &str = "[REDACTED]";

/// Redaction-safe rendering of an error or value.
pub trait Redact {
    /// Message with paths, captured output and nested error text removed.
    fn redacted(&self) -> String;
}

static SANITIZE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Environment variable assignments
        (r"\b([A-Z][A-Z0-9_]*)=[^\s]+", "$1=[REDACTED]"),
        // Tokens and keys
        (r"(?i)(token|key|password|secret)[=:]\s*[^\s]+", "$1=[REDACTED]"),
        // Absolute paths
        (r"(^|[\s'\x22(])/[^\s'\x22)]+", "$1[REDACTED]"),
        // Base64-looking strings (48+ chars of base64 characters)
        (r"[A-Za-z0-9+/]{48,}={0,2}", "[REDACTED_BASE64]"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Scrub free text (e.g. captured stderr) of values that may be sensitive.
pub fn sanitize(text: &str) -> String {
    let mut sanitized = text.to_string();
    for (re, replacement) in SANITIZE_PATTERNS.iter() {
        sanitized = re.replace_all(&sanitized, *replacement).into_owned();
    }
    sanitized
}
