//! The script file as an editor.

use core_events::EditorId;
use core_live::EditorHandle;
use core_text::{Document, EditorSnapshot};
use std::path::PathBuf;
use tracing::{trace, warn};

/// Re-reads the script on every snapshot so watch mode always sees the
/// latest save.
pub struct FileEditor {
    id: EditorId,
    path: PathBuf,
    line: Option<usize>,
}

impl FileEditor {
    /// `line` pins the cursor; otherwise it follows the last non-blank line.
    pub fn new(id: EditorId, path: impl Into<PathBuf>, line: Option<usize>) -> Self {
        Self {
            id,
            path: path.into(),
            line,
        }
    }

    fn read(&self) -> Document {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                trace!(target: "io", file = %self.path.display(), size_bytes = content.len(), "file_read_ok");
                Document::from_str(&content)
            }
            Err(e) => {
                warn!(target: "io", file = %self.path.display(), ?e, "file_read_error");
                Document::default()
            }
        }
    }
}

impl EditorHandle for FileEditor {
    fn id(&self) -> EditorId {
        self.id
    }

    fn snapshot(&self) -> EditorSnapshot {
        let document = self.read();
        let cursor = self
            .line
            .or_else(|| document.last_non_blank_line())
            .unwrap_or(0);
        EditorSnapshot::new(document, cursor)
    }
}
