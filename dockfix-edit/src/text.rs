//! Small line-level helpers shared by repair strategies.

/// Leading indentation of `line` as spaces, tabs counting as four.
///
/// Unindented lines yield four spaces so continuation lines still stand out.
pub fn line_indent(line: &str) -> String {
    let width: usize = line
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();
    " ".repeat(if width > 0 { width } else { 4 })
}

/// Strips one pair of matching single or double quotes.
pub fn dequote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && bytes[0] == bytes[bytes.len() - 1]
        && (bytes[0] == b'"' || bytes[0] == b'\'')
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// True when the trimmed line ends with a backslash continuation.
pub fn continues(line: &str) -> bool {
    line.trim_end().ends_with('\\')
}

/// Byte offset of `word` in `line` at or after `from`, bounded by whitespace,
/// quotes or the line edges.
pub fn find_word(line: &str, word: &str, from: usize) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    let is_boundary = |c: char| c.is_whitespace() || c == '"' || c == '\'';
    let mut search = from;
    while search <= line.len() {
        let pos = search + line.get(search..)?.find(word)?;
        let end = pos + word.len();
        let before_ok = line[..pos].chars().next_back().is_none_or(is_boundary);
        let after_ok = line[end..].chars().next().is_none_or(is_boundary);
        if before_ok && after_ok {
            return Some(pos);
        }
        search = pos + word.len().max(1);
    }
    None
}
