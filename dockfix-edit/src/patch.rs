use diffy::PatchFormatter;

/// Unified diff between the original and repaired contents of one file.
///
/// Returns an empty string when nothing changed.
pub fn render_patch(path: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

    let patch = diffy::create_patch(before, after);
    let body = PatchFormatter::new().fmt_patch(&patch).to_string();
    // diffy emits its own `---`/`+++` header; keep only the hunks.
    let hunks = body
        .split_once("\n@@")
        .map(|(_, rest)| format!("@@{}", rest))
        .unwrap_or(body);
    out.push_str(&hunks);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
