//! Unified diff rendering for operator review.

use similar::{ChangeTag, TextDiff};

const RED: &str = "\x1b[91m";
const GREEN: &str = "\x1b[92m";
const CYAN: &str = "\x1b[96m";
const RESET: &str = "\x1b[0m";

/// Render a colored unified diff between the current artifact and a
/// candidate rewrite.
pub fn render_diff(old: &str, new: &str, label: &str) -> String {
    let diff = TextDiff::from_lines(old, new);

    let mut out = String::new();
    out.push_str("\n=== Code Changes ===\n");
    out.push_str(&format!("{CYAN}--- {label} (before){RESET}\n"));
    out.push_str(&format!("{CYAN}+++ {label} (after){RESET}\n"));

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        out.push_str(&format!("{CYAN}{}{RESET}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let (color, sign) = match change.tag() {
                ChangeTag::Delete => (RED, '-'),
                ChangeTag::Insert => (GREEN, '+'),
                ChangeTag::Equal => ("", ' '),
            };
            let reset = if color.is_empty() { "" } else { RESET };
            let line = change.value().trim_end_matches('\n');
            out.push_str(&format!("{color}{sign}{line}{reset}\n"));
        }
    }

    out.push_str("====================\n");
    out
}
