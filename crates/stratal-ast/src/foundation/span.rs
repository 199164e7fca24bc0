//! Source location tracking for diagnostics.
//!
//! - `Span` — compact byte-range reference into a source file
//! - `SourceMap` — registry of all source files in a run
//! - `SourceFile` — one file with a line-start index for line/column lookup

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compact source location reference.
///
/// Points to a byte range in a source file with a cached line number so
/// that diagnostics can be rendered without a `SourceMap` at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index into `SourceMap::files`.
    pub file_id: u16,
    /// Byte offset of the start position.
    pub start: u32,
    /// Byte offset of the end position (exclusive).
    pub end: u32,
    /// 1-based line number of the start position.
    pub start_line: u16,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32, start_line: u16) -> Self {
        Self {
            file_id,
            start,
            end,
            start_line,
        }
    }

    /// Zero-length span at the start of a file. Used for program-level
    /// diagnostics that have no anchoring node.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0, 1)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Span covering both inputs.
    ///
    /// # Panics
    /// Panics if the spans come from different files.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot merge spans from different files"
        );
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            start_line: self.start_line.min(other.start_line),
        }
    }
}

/// Registry of all source files participating in a check run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with a line-start index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    /// Byte offset at which each line begins. Always holds at least the
    /// entry for line 1 (offset 0); a line's end is the next entry, or
    /// EOF for the last line.
    line_starts: Vec<u32>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file and return its id.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let file_id = self.files.len();
        assert!(file_id < u16::MAX as usize, "too many source files");
        self.files.push(SourceFile::new(path, source));
        file_id as u16
    }

    pub fn file(&self, span: &Span) -> &SourceFile {
        &self.files[span.file_id as usize]
    }

    pub fn file_path(&self, span: &Span) -> &Path {
        &self.files[span.file_id as usize].path
    }

    /// Source text covered by a span.
    pub fn snippet(&self, span: &Span) -> &str {
        let file = self.file(span);
        &file.source[span.start as usize..span.end as usize]
    }

    /// 1-based (line, column) of a span's start.
    pub fn line_col(&self, span: &Span) -> (u32, u32) {
        self.file(span).line_col(span.start)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl SourceFile {
    pub fn new(path: PathBuf, source: String) -> Self {
        let line_starts = line_index(&source);
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// 1-based (line, column) for a byte offset.
    ///
    /// # Panics
    /// Panics if the offset points past the end of the file.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        assert!(
            offset as usize <= self.source.len(),
            "offset {} outside source of {} bytes",
            offset,
            self.source.len()
        );
        // The containing line is the last one starting at or before the
        // offset; line 1 starts at 0, so the count is never zero.
        let line_idx = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line = (line_idx + 1) as u32;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Text of a 1-based line, newline included, `None` if out of
    /// bounds. The last line runs to EOF.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let line_idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(line_idx)? as usize;
        let end = self
            .line_starts
            .get(line_idx + 1)
            .map(|&next| next as usize)
            .unwrap_or(self.source.len());
        Some(&self.source[start..end])
    }
}

/// Byte offset of every line start. A line begins at offset 0 or right
/// after a newline byte; trailing newlines open a final empty line.
fn line_index(source: &str) -> Vec<u32> {
    let mut starts = vec![0];
    starts.extend(
        source
            .bytes()
            .enumerate()
            .filter(|&(_, byte)| byte == b'\n')
            .map(|(pos, _)| pos as u32 + 1),
    );
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_covers_both() {
        let a = Span::new(0, 10, 20, 1);
        let b = Span::new(0, 15, 30, 2);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 10);
        assert_eq!(merged.end, 30);
        assert_eq!(merged.start_line, 1);
    }

    #[test]
    fn line_col_lookup() {
        let file = SourceFile::new(PathBuf::from("test.dl"), "hello\nworld\n".to_string());
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(6), (2, 1));
        assert_eq!(file.line_col(8), (2, 3));
    }

    #[test]
    fn snippet_extraction() {
        let mut map = SourceMap::new();
        let id = map.add_file(PathBuf::from("test.dl"), "A(x) :- B(x).".to_string());
        let span = Span::new(id, 8, 12, 1);
        assert_eq!(map.snippet(&span), "B(x)");
        assert_eq!(map.line_col(&span), (1, 9));
    }

    #[test]
    fn line_text_bounds() {
        let file = SourceFile::new(PathBuf::from("test.dl"), "a\nb".to_string());
        assert_eq!(file.line_text(1), Some("a\n"));
        assert_eq!(file.line_text(2), Some("b"));
        assert_eq!(file.line_text(3), None);
    }

    #[test]
    fn trailing_newline_opens_an_empty_last_line() {
        let file = SourceFile::new(PathBuf::from("test.dl"), "a\nb\n".to_string());
        assert_eq!(file.line_text(2), Some("b\n"));
        assert_eq!(file.line_text(3), Some(""));
        assert_eq!(file.line_col(4), (3, 1));
    }

    #[test]
    #[should_panic(expected = "cannot merge spans from different files")]
    fn merge_rejects_cross_file_spans() {
        let a = Span::new(0, 0, 1, 1);
        let b = Span::new(1, 0, 1, 1);
        let _ = a.merge(&b);
    }
}
