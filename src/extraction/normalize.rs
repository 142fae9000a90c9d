//! Cleanup of captured prompt fragments

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*").unwrap());

static WHITESPACE_RUN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

const BULLET_MARKERS: &[char] = &['-', '•', '·'];

const QUOTE_MARKS: &[char] = &['"', '\'', '“', '”', '‘', '’', '「', '」', '『', '』'];

/// Turn a captured fragment into a single-line prompt.
///
/// Strips one leading bullet, one quote mark at each end, folds line breaks
/// and whitespace runs into single spaces. Returns `None` when nothing is left.
pub fn normalize_prompt(fragment: &str) -> Option<String> {
    let mut text = fragment.trim();

    // `*` counts as a bullet only when followed by a space, so `*emphasis*` survives
    let bullet = text
        .strip_prefix(BULLET_MARKERS)
        .or_else(|| text.strip_prefix("* "));
    if let Some(rest) = bullet {
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_prefix(QUOTE_MARKS) {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix(QUOTE_MARKS) {
        text = rest;
    }

    let single_line = LINE_BREAK_REGEX.replace_all(text, " ");
    let collapsed = WHITESPACE_RUN_REGEX.replace_all(&single_line, " ");
    let prompt = collapsed.trim();

    if prompt.is_empty() {
        None
    } else {
        Some(prompt.to_string())
    }
}
