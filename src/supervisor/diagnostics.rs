//! Error notice shortening
//!
//! Tracebacks are long; a notice has room for one line. The fragment that
//! matters starts at the first `File "<...>", line N` locator and runs to
//! the end. Its lines are trimmed and joined with single spaces.

use once_cell::sync::Lazy;
use regex::Regex;

static LOCATOR: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r#"(?s)  (File "<\w+>", line \d+(, in <module>|).*)"#)
        .map_err(|e| error!("Invalid traceback locator pattern: {}", e))
        .ok()
});

/// The concise, single-line form of an error text. Text without a locator
/// is returned as is, minus trailing whitespace.
pub fn shorten(stderr: &str) -> String {
    let fragment = LOCATOR
        .as_ref()
        .and_then(|re| re.captures(stderr))
        .and_then(|caps| caps.get(1));

    match fragment {
        Some(fragment) => fragment
            .as_str()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        None => stderr.trim_end().to_string(),
    }
}

/// Whether a locator is present
pub fn has_locator(stderr: &str) -> bool {
    LOCATOR
        .as_ref()
        .is_some_and(|re| re.is_match(stderr))
}
