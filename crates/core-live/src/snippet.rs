//! Snippet extraction: the document prefix through the cursor line.

/// Immutable unit of work consumed once by a `ProcessRunner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    source: String,
    target_line: usize,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>, target_line: usize) -> Self {
        Self {
            source: source.into(),
            target_line,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target_line(&self) -> usize {
        self.target_line
    }
}

/// Lines `0..=cursor_line` of `document_text`, `\n` joined, plus one trailing `\n`.
/// A cursor past the end takes the whole document.
pub fn extract(document_text: &str, cursor_line: usize) -> ExecutionRequest {
    let prefix: Vec<&str> = document_text
        .split('\n')
        .take(cursor_line.saturating_add(1))
        .collect();
    let mut source = prefix.join("\n");
    source.push('\n');
    ExecutionRequest::new(source, cursor_line)
}
