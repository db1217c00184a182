//! Rope-backed, immutable document snapshots.
//!
//! The live pipeline never owns an editor buffer. It reads a `Document`
//! captured from the host at the moment a trigger fires and uses it to
//! classify the cursor line, build the snippet and validate annotation
//! targets. Line counting follows `ropey`: a trailing `\n` opens an empty
//! final line, which matches how editors number lines.

use ropey::Rope;

/// Immutable text snapshot of one editor's document.
#[derive(Clone, Debug, Default)]
pub struct Document {
    rope: Rope,
}

impl Document {
    /// Construct a document from an in-memory string slice.
    pub fn from_str(content: &str) -> Self {
        Self {
            rope: Rope::from_str(content),
        }
    }

    /// Full text of the document.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Total number of lines.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn is_valid_line(&self, idx: usize) -> bool {
        idx < self.rope.len_lines()
    }

    /// Return the requested line as an owned `String` without its terminator.
    pub fn line(&self, idx: usize) -> Option<String> {
        if !self.is_valid_line(idx) {
            return None;
        }
        let mut s = self.rope.line(idx).to_string();
        if s.ends_with('\n') {
            s.pop();
        }
        if s.ends_with('\r') {
            s.pop();
        }
        Some(s)
    }

    /// Length of a line in chars, excluding the terminator. Zero for invalid lines.
    pub fn line_len(&self, idx: usize) -> usize {
        self.line(idx).map(|l| l.chars().count()).unwrap_or(0)
    }

    /// Index of the last line containing non-whitespace text, if any.
    pub fn last_non_blank_line(&self) -> Option<usize> {
        (0..self.line_count())
            .rev()
            .find(|&i| self.line(i).is_some_and(|l| !l.trim().is_empty()))
    }
}

/// Document plus cursor, captured together when a trigger fires.
#[derive(Clone, Debug)]
pub struct EditorSnapshot {
    pub document: Document,
    pub cursor_line: usize,
}

impl EditorSnapshot {
    pub fn new(document: Document, cursor_line: usize) -> Self {
        Self {
            document,
            cursor_line,
        }
    }

    /// Text of the cursor line, empty when the cursor is past the end.
    pub fn cursor_line_text(&self) -> String {
        self.document.line(self.cursor_line).unwrap_or_default()
    }
}
