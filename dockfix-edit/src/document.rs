use crate::error::{EditError, EditResult};
use crate::parser::{Command, CommandMap, parse_commands};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use fs_err as fs;
use tracing::debug;

/// A line index paired with the document version it was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRef {
    pub line: usize,
    pub version: u64,
}

/// Saved state used to roll back a failed repair.
#[derive(Debug, Clone)]
pub struct Snapshot {
    lines: Vec<String>,
    trailing_newline: bool,
    layout_version: u64,
    dirty: bool,
}

/// A Dockerfile as a mutable, versioned sequence of lines.
///
/// Every mutation bumps `version`. A mutation that changes the line count also
/// moves `layout_version` and sets the dirty flag; line indices captured
/// before that point are rejected by [`Dockerfile::resolve`].
#[derive(Debug, Clone)]
pub struct Dockerfile {
    path: Utf8PathBuf,
    lines: Vec<String>,
    trailing_newline: bool,
    reference_date: NaiveDate,
    commands: CommandMap,
    version: u64,
    layout_version: u64,
    parsed_version: u64,
    dirty: bool,
}

impl Dockerfile {
    pub fn load(path: &Utf8Path, reference_date: NaiveDate) -> EditResult<Self> {
        let contents = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        Self::from_contents(path, &contents, reference_date)
    }

    pub fn from_contents(
        path: impl Into<Utf8PathBuf>,
        contents: &str,
        reference_date: NaiveDate,
    ) -> EditResult<Self> {
        let path = path.into();
        let lines: Vec<String> = contents.lines().map(str::to_string).collect();
        let commands = parse_commands(&lines)?;
        debug!(path = %path, lines = lines.len(), commands = commands.len(), "loaded dockerfile");

        Ok(Self {
            path,
            lines,
            trailing_newline: contents.ends_with('\n'),
            reference_date,
            commands,
            version: 0,
            layout_version: 0,
            parsed_version: 0,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn layout_version(&self) -> u64 {
        self.layout_version
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// 1-based line access.
    pub fn line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    pub fn contents(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }

    /// The command map, regardless of whether it matches the current lines.
    pub fn commands(&self) -> &CommandMap {
        &self.commands
    }

    /// The command map, only if it was derived from the current lines.
    pub fn current_commands(&self) -> EditResult<&CommandMap> {
        if self.parsed_version != self.version {
            return Err(EditError::StaleParse {
                parsed: self.parsed_version,
                current: self.version,
            });
        }
        Ok(&self.commands)
    }

    /// The current command whose span contains `line`.
    pub fn command_containing(&self, line: usize) -> EditResult<Option<&Command>> {
        let commands = self.current_commands()?;
        Ok(commands
            .range(..=line)
            .next_back()
            .map(|(_, c)| c)
            .filter(|c| c.contains_line(line)))
    }

    /// The last `FROM` starting at or before `line`.
    pub fn stage_of(&self, line: usize) -> EditResult<Option<&Command>> {
        let commands = self.current_commands()?;
        Ok(commands
            .range(..=line)
            .rev()
            .map(|(_, c)| c)
            .find(|c| c.is("FROM")))
    }

    /// Follows `FROM <stage>` references back to a registry image.
    pub fn base_image_of(&self, line: usize) -> EditResult<Option<String>> {
        let commands = self.current_commands()?;
        let mut image = match self.stage_of(line)?.and_then(Command::from_image) {
            Some(i) => i.to_string(),
            None => return Ok(None),
        };

        // Bounded by the number of stages; a cycle cannot be longer than that.
        for _ in 0..commands.len() {
            let parent = commands
                .values()
                .rev()
                .filter(|c| c.start_line < line)
                .find(|c| c.stage_name().is_some_and(|s| s.eq_ignore_ascii_case(&image)));
            match parent.and_then(Command::from_image) {
                Some(next) => image = next.to_string(),
                None => break,
            }
        }
        Ok(Some(image))
    }

    pub fn line_ref(&self, line: usize) -> LineRef {
        LineRef {
            line,
            version: self.version,
        }
    }

    /// Validates a captured line index against the current layout.
    pub fn resolve(&self, line_ref: LineRef) -> EditResult<usize> {
        self.check_line(line_ref.line)?;
        if line_ref.version < self.layout_version {
            return Err(EditError::StaleLine {
                line: line_ref.line,
                captured: line_ref.version,
                layout: self.layout_version,
            });
        }
        Ok(line_ref.line)
    }

    /// Replaces lines `start..=end` with `new_lines`.
    ///
    /// Entries containing `\n` are split into several lines. The document
    /// turns dirty when the line count changes.
    pub fn replace_range(&mut self, start: usize, end: usize, new_lines: Vec<String>) -> EditResult<()> {
        self.check_line(start)?;
        self.check_line(end)?;
        if end < start {
            return Err(EditError::LineOutOfRange {
                line: end,
                len: self.lines.len(),
            });
        }
        self.splice(start - 1, end - start + 1, new_lines);
        Ok(())
    }

    pub fn set_line(&mut self, line: usize, text: impl Into<String>) -> EditResult<()> {
        self.replace_range(line, line, vec![text.into()])
    }

    /// Inserts `text` so that it becomes line `line`; `line_count() + 1` appends.
    pub fn insert_at(&mut self, line: usize, text: impl Into<String>) -> EditResult<()> {
        if line == 0 || line > self.lines.len() + 1 {
            return Err(EditError::LineOutOfRange {
                line,
                len: self.lines.len(),
            });
        }
        self.splice(line - 1, 0, vec![text.into()]);
        Ok(())
    }

    pub fn delete_at(&mut self, line: usize) -> EditResult<()> {
        self.check_line(line)?;
        self.splice(line - 1, 1, vec![]);
        Ok(())
    }

    /// Re-derives the command map from the current lines.
    pub fn reparse(&mut self) -> EditResult<()> {
        self.commands = parse_commands(&self.lines)?;
        self.parsed_version = self.version;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            lines: self.lines.clone(),
            trailing_newline: self.trailing_newline,
            layout_version: self.layout_version,
            dirty: self.dirty,
        }
    }

    /// Puts back the lines of `snapshot`.
    ///
    /// The version still moves forward, but line refs taken before the
    /// snapshot stay valid because the layout is identical to what they saw.
    pub fn restore(&mut self, snapshot: Snapshot) -> EditResult<()> {
        self.lines = snapshot.lines;
        self.trailing_newline = snapshot.trailing_newline;
        self.version += 1;
        self.layout_version = snapshot.layout_version;
        self.dirty = snapshot.dirty;
        self.reparse()
    }

    fn check_line(&self, line: usize) -> EditResult<()> {
        if line == 0 || line > self.lines.len() {
            return Err(EditError::LineOutOfRange {
                line,
                len: self.lines.len(),
            });
        }
        Ok(())
    }

    fn splice(&mut self, index: usize, remove: usize, new_lines: Vec<String>) {
        let replacement: Vec<String> = new_lines
            .iter()
            .flat_map(|l| l.split('\n'))
            .map(str::to_string)
            .collect();
        let changes_layout = replacement.len() != remove;

        self.lines.splice(index..index + remove, replacement);
        self.version += 1;
        if changes_layout {
            self.layout_version = self.version;
            self.dirty = true;
        }
    }
}
