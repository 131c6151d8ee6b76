//! Splits Dockerfile lines into instruction records.
//!
//! Only instruction boundaries and argument tokens are derived here, enough
//! for repair strategies. Grammar checks are left to the analyzer.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use thiserror::Error;

pub const INSTRUCTIONS: &[&str] = &[
    "ADD",
    "ARG",
    "CMD",
    "COPY",
    "ENTRYPOINT",
    "ENV",
    "EXPOSE",
    "FROM",
    "HEALTHCHECK",
    "LABEL",
    "MAINTAINER",
    "ONBUILD",
    "RUN",
    "SHELL",
    "STOPSIGNAL",
    "USER",
    "VOLUME",
    "WORKDIR",
];

/// Instructions that accept the JSON exec form.
const JSON_FORM: &[&str] = &[
    "ADD",
    "CMD",
    "COPY",
    "ENTRYPOINT",
    "RUN",
    "SHELL",
    "VOLUME",
];

/// Instructions whose arguments are kept as a single raw string.
const RAW_ARGUMENT: &[&str] = &[
    "CMD",
    "ENTRYPOINT",
    "HEALTHCHECK",
    "MAINTAINER",
    "ONBUILD",
    "RUN",
    "SHELL",
    "STOPSIGNAL",
    "USER",
    "WORKDIR",
];

/// Instructions that may carry leading `--flag` options.
const FLAGGED: &[&str] = &["ADD", "COPY", "FROM", "HEALTHCHECK", "RUN"];

pub fn is_instruction(word: &str) -> bool {
    INSTRUCTIONS.iter().any(|i| i.eq_ignore_ascii_case(word))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unknown instruction `{word}`")]
    UnknownInstruction { line: usize, word: String },

    #[error("line {line}: {instruction} requires arguments")]
    MissingArguments { line: usize, instruction: String },
}

/// One logical instruction, possibly spanning continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Upper-cased instruction name.
    pub name: String,
    /// Leading `--flag[=value]` options, verbatim.
    pub flags: Vec<String>,
    /// Argument tokens.
    ///
    /// Exec form yields the array elements; `LABEL`/`ENV` yield alternating
    /// keys and raw values; `RUN`, `CMD` and similar shell-form instructions
    /// yield a single joined string; the rest are split on whitespace.
    pub args: Vec<String>,
    pub json_form: bool,
    /// 1-based, inclusive.
    pub start_line: usize,
    pub end_line: usize,
}

impl Command {
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn lines(&self) -> RangeInclusive<usize> {
        self.start_line..=self.end_line
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.lines().contains(&line)
    }

    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Joined shell-form text, or the exec-form elements joined by spaces.
    pub fn text(&self) -> String {
        self.args.join(" ")
    }

    /// Image argument of a `FROM`, skipping flags.
    pub fn from_image(&self) -> Option<&str> {
        if !self.is("FROM") {
            return None;
        }
        self.args.first().map(String::as_str)
    }

    /// Stage name introduced by `FROM <image> AS <name>`.
    pub fn stage_name(&self) -> Option<&str> {
        if !self.is("FROM") || self.args.len() < 3 {
            return None;
        }
        if self.args[1].eq_ignore_ascii_case("as") {
            Some(self.args[2].as_str())
        } else {
            None
        }
    }
}

/// Start line (1-based) to command.
pub type CommandMap = BTreeMap<usize, Command>;

pub fn parse_commands(lines: &[String]) -> Result<CommandMap, ParseError> {
    let escape = escape_directive(lines);
    let mut commands = CommandMap::new();
    let n = lines.len();
    let mut i = 0;

    while i < n {
        let trimmed = lines[i].trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            i += 1;
            continue;
        }

        let start = i;
        let mut last = i;
        let mut text = String::new();
        loop {
            let current = lines[last].trim_end();
            match current.strip_suffix(escape) {
                Some(stripped) => {
                    text.push_str(stripped);
                    let mut next = last + 1;
                    while next < n && is_skippable_in_continuation(&lines[next]) {
                        next += 1;
                    }
                    if next >= n {
                        break;
                    }
                    last = next;
                }
                None => {
                    text.push_str(current);
                    break;
                }
            }
        }

        let command = parse_instruction(&text, start + 1, last + 1)?;
        commands.insert(command.start_line, command);
        i = last + 1;
    }

    Ok(commands)
}

fn is_skippable_in_continuation(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

/// Reads a `# escape=` parser directive from the head of the file.
fn escape_directive(lines: &[String]) -> char {
    for line in lines {
        let Some(body) = line.trim().strip_prefix('#') else {
            break;
        };
        let Some((key, value)) = body.split_once('=') else {
            break;
        };
        if key.trim().eq_ignore_ascii_case("escape") {
            if value.trim() == "`" {
                return '`';
            }
            break;
        }
    }
    '\\'
}

fn parse_instruction(text: &str, start_line: usize, end_line: usize) -> Result<Command, ParseError> {
    let body = text.trim();
    let (word, rest) = match body.find(char::is_whitespace) {
        Some(pos) => (&body[..pos], body[pos..].trim()),
        None => (body, ""),
    };

    if !is_instruction(word) {
        return Err(ParseError::UnknownInstruction {
            line: start_line,
            word: word.to_string(),
        });
    }
    let name = word.to_ascii_uppercase();

    let mut rest = rest;
    let mut flags = Vec::new();
    if FLAGGED.contains(&name.as_str()) {
        while rest.starts_with("--") {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            flags.push(rest[..end].to_string());
            rest = rest[end..].trim_start();
        }
    }

    let mut json_form = false;
    let args = if JSON_FORM.contains(&name.as_str()) && rest.starts_with('[') {
        match serde_json::from_str::<Vec<String>>(rest) {
            Ok(items) => {
                json_form = true;
                items
            }
            Err(_) => vec![rest.to_string()],
        }
    } else if name == "LABEL" || name == "ENV" {
        key_values(rest)
    } else if RAW_ARGUMENT.contains(&name.as_str()) {
        if rest.is_empty() {
            vec![]
        } else {
            vec![rest.to_string()]
        }
    } else {
        rest.split_whitespace().map(str::to_string).collect()
    };

    if args.is_empty() && !json_form {
        return Err(ParseError::MissingArguments {
            line: start_line,
            instruction: name,
        });
    }

    Ok(Command {
        name,
        flags,
        args,
        json_form,
        start_line,
        end_line,
    })
}

/// `k=v k2="v 2"` pairs, or the legacy `KEY value with spaces` form.
fn key_values(rest: &str) -> Vec<String> {
    let words = split_words(rest);
    let Some(first) = words.first() else {
        return vec![];
    };

    if split_key_value(first).is_none() {
        let value = rest[first.len()..].trim();
        return vec![first.clone(), value.to_string()];
    }

    let mut out = Vec::with_capacity(words.len() * 2);
    for w in &words {
        match split_key_value(w) {
            Some((k, v)) => {
                out.push(k.to_string());
                out.push(v.to_string());
            }
            None => {
                out.push(w.clone());
                out.push(String::new());
            }
        }
    }
    out
}

/// Splits on whitespace outside quotes; quotes and escapes are kept verbatim.
pub fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                cur.push(c);
                if c == '\\' && q == '"' {
                    if let Some(next) = chars.next() {
                        cur.push(next);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if !cur.is_empty() {
                    words.push(std::mem::take(&mut cur));
                }
            }
            None => {
                cur.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        cur.push(next);
                    }
                } else if c == '"' || c == '\'' {
                    quote = Some(c);
                }
            }
        }
    }
    if !cur.is_empty() {
        words.push(cur);
    }
    words
}

/// Splits `key=value` at the first `=` outside quotes.
pub fn split_key_value(word: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    for (i, c) in word.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '=' => return Some((&word[..i], &word[i + 1..])),
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &str) -> Vec<String> {
        s.lines().map(str::to_string).collect()
    }

    #[test]
    fn splits_simple_instructions() {
        let cmds = parse_commands(&lines("FROM ubuntu:20.04\nRUN apt-get update\n")).unwrap();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[&1].name, "FROM");
        assert_eq!(cmds[&1].from_image(), Some("ubuntu:20.04"));
        assert_eq!(cmds[&2].args, vec!["apt-get update".to_string()]);
    }

    #[test]
    fn joins_continuations_and_skips_inner_comments() {
        let src = "FROM debian\nRUN apt-get update && \\\n    # refresh\n    apt-get install -y curl\nUSER app\n";
        let cmds = parse_commands(&lines(src)).unwrap();
        let run = &cmds[&2];
        assert_eq!(run.start_line, 2);
        assert_eq!(run.end_line, 4);
        assert!(run.args[0].contains("apt-get install -y curl"));
        assert_eq!(cmds[&5].name, "USER");
    }

    #[test]
    fn honors_backtick_escape_directive() {
        let src = "# escape=`\nFROM mcr.microsoft.com/windows\nRUN dir `\n  c:\\\n";
        let cmds = parse_commands(&lines(src)).unwrap();
        let run = &cmds[&3];
        assert_eq!(run.end_line, 4);
    }

    #[test]
    fn exec_form_yields_elements() {
        let cmds = parse_commands(&lines("FROM x\nCMD [\"nginx\", \"-g\", \"daemon off;\"]")).unwrap();
        let cmd = &cmds[&2];
        assert!(cmd.json_form);
        assert_eq!(cmd.args, vec!["nginx", "-g", "daemon off;"]);
    }

    #[test]
    fn label_pairs_keep_raw_values() {
        let cmds = parse_commands(&lines("FROM x\nLABEL Version=\"1.0\" myLabel=foo")).unwrap();
        assert_eq!(cmds[&2].args, vec!["Version", "\"1.0\"", "myLabel", "foo"]);
    }

    #[test]
    fn legacy_env_form() {
        let cmds = parse_commands(&lines("FROM x\nENV PATH /usr/local/bin:$PATH")).unwrap();
        assert_eq!(cmds[&2].args, vec!["PATH", "/usr/local/bin:$PATH"]);
    }

    #[test]
    fn flags_and_stage_names() {
        let cmds =
            parse_commands(&lines("FROM --platform=linux/amd64 golang:1.22 AS build\nRUN --mount=type=cache,target=/root go build")).unwrap();
        assert_eq!(cmds[&1].flags, vec!["--platform=linux/amd64"]);
        assert_eq!(cmds[&1].from_image(), Some("golang:1.22"));
        assert_eq!(cmds[&1].stage_name(), Some("build"));
        assert_eq!(cmds[&2].flags.len(), 1);
        assert_eq!(cmds[&2].args, vec!["go build"]);
    }

    #[test]
    fn unknown_instruction_is_rejected() {
        let err = parse_commands(&lines("FROM x\nFORM y")).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownInstruction {
                line: 2,
                word: "FORM".into()
            }
        );
    }

    #[test]
    fn from_without_image_is_rejected() {
        let err = parse_commands(&lines("FROM")).unwrap_err();
        assert!(matches!(err, ParseError::MissingArguments { line: 1, .. }));
    }

    #[test]
    fn lowercase_instructions_are_accepted() {
        let cmds = parse_commands(&lines("from alpine\nrun echo hi")).unwrap();
        assert_eq!(cmds[&2].name, "RUN");
    }

    #[test]
    fn split_words_respects_quotes() {
        assert_eq!(
            split_words(r#"a="b c" d='e f' g\ h"#),
            vec![r#"a="b c""#, "d='e f'", r"g\ h"]
        );
    }
}
