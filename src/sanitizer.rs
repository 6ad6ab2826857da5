//! Cleanup of answer text for display and export.
//!
//! The answering service tends to leave numeric citation markers such as `[1]`
//! in the answer body and to append a `References:` block that repeats the
//! structured references. Both are removed here, in that order: markers first,
//! then the block, so a block header split by a marker is still found.

use std::sync::LazyLock;

use regex::Regex;

/// A bracketed decimal integer, together with any spaces or tabs right before it.
static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\[[0-9]+\]").expect("citation marker pattern is valid"));

/// Start of a server-appended references block.
static REFERENCES_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)references:").expect("references block pattern is valid"));

/// Returns the displayable form of a raw answer.
///
/// Absent or empty input yields an empty string. Otherwise every `[n]`
/// marker is removed, everything from the first `References:` (any case)
/// to the end is dropped, and the result is trimmed.
///
/// # Examples
///
/// ```
/// use rfpbot::sanitizer::clean;
///
/// assert_eq!(
///     clean(Some("Paris is the capital. References: [1] Wiki")),
///     "Paris is the capital."
/// );
/// assert_eq!(clean(None), "");
/// ```
pub fn clean(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|text| !text.is_empty()) else {
        return String::new();
    };

    let without_markers = strip_citation_markers(raw);
    truncate_references_block(&without_markers).trim().to_string()
}

/// Removes every numeric citation marker.
///
/// Runs until no marker is left, since removing `[1]` from `[[1]2]` exposes `[2]`.
pub fn strip_citation_markers(text: &str) -> String {
    let mut current = text.to_string();
    while CITATION_MARKER.is_match(&current) {
        current = CITATION_MARKER.replace_all(&current, "").into_owned();
    }
    current
}

/// Cuts the text at the first case-insensitive `References:`.
pub fn truncate_references_block(text: &str) -> &str {
    match REFERENCES_BLOCK.find(text) {
        Some(block) => &text[..block.start()],
        None => text,
    }
}
