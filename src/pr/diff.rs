use super::types::{DiffFetch, DiffPayload};

/// Classify and bound raw diff text from the hosting API.
///
/// Whitespace-only text means the PR has nothing to review. Anything else is
/// cut to its first `max_chars` characters; reaching the budget at all marks
/// the payload as truncated. The cut is positional and never snaps to a line
/// or hunk boundary.
pub fn bound_diff(raw: &str, max_chars: usize) -> DiffFetch {
    if raw.trim().is_empty() {
        return DiffFetch::NoChanges;
    }
    let (raw_text, truncated) = truncate_chars(raw, max_chars);
    DiffFetch::Changes(DiffPayload {
        raw_text,
        truncated,
    })
}

/// Cut `text` to at most `max_chars` characters.
///
/// Returns the kept prefix and whether the text was at or over the budget.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => {
            let at_budget = text.chars().count() == max_chars;
            (text.to_string(), at_budget)
        }
    }
}
