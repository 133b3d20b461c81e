//! Fenced code-block extraction from raw model responses.
//!
//! Grammar: the proposal is the content between the LAST opening fence
//! (```` ``` ```` plus an optional language tag on the same line) and the
//! next fence after it. Responses routinely quote earlier code before the
//! final version, so the last block wins.

const FENCE: &str = "```";

/// Extract the proposal from a raw response, or `None` when no valid fence
/// pair exists.
pub fn extract_code(response: &str) -> Option<String> {
    let fences: Vec<usize> = response.match_indices(FENCE).map(|(i, _)| i).collect();
    if fences.len() < 2 {
        return None;
    }

    let close = fences[fences.len() - 1];
    let open = fences[fences.len() - 2];

    // Skip the optional language tag: content starts on the line after the
    // opening marker.
    let after_marker = open + FENCE.len();
    let content_start = response[after_marker..]
        .find('\n')
        .map(|offset| after_marker + offset + 1)?;
    if content_start > close {
        return None;
    }

    Some(response[content_start..close].trim().to_string())
}
