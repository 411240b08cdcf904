//! Terminal output utilities

use console::style;
use flakeforge_core::redact::sanitize;
use flakeforge_core::Redact;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Text shown for a failed command.
///
/// Debug mode gets the whole chain. Otherwise library errors are reduced to
/// their redacted form, behind any context added by the command; user errors
/// are shown as they are.
pub fn render_error(err: &anyhow::Error, debug: bool) -> String {
    if debug {
        return format!("{:#}", err);
    }

    let (message, redacted) = if let Some(e) = err.downcast_ref::<flakeforge_nix::Error>() {
        if e.is_user_error() {
            return e.to_string();
        }
        (e.to_string(), e.redacted())
    } else if let Some(e) = err.downcast_ref::<flakeforge_gen::Error>() {
        (e.to_string(), e.redacted())
    } else if let Some(e) = err.downcast_ref::<flakeforge_core::Error>() {
        (e.to_string(), e.redacted())
    } else {
        return sanitize(&format!("{:#}", err));
    };

    // `err` displays as the outermost context, or as the error itself
    let outer = err.to_string();
    if outer == message {
        redacted
    } else {
        format!("{}: {}", outer, redacted)
    }
}
