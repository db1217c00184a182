//! Terminal rendering of annotations.
//!
//! Inline decorations print as `label:line  # text` in the annotation color.
//! A highlight has no output of its own; it makes the inline text on the same
//! line bold. Alerts go to stderr unstyled.

use core_events::EditorId;
use core_live::{AnnotationSurface, Decoration, DecorationId};
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{trace, warn};

type Sink = Mutex<Box<dyn Write + Send>>;

/// Map a configured color name onto a terminal color. Unknown names yield
/// `None` and print in the terminal default.
pub fn parse_color(name: &str) -> Option<Color> {
    let color = match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "dark_red" => Color::DarkRed,
        "green" => Color::Green,
        "dark_green" => Color::DarkGreen,
        "yellow" => Color::Yellow,
        "dark_yellow" => Color::DarkYellow,
        "blue" => Color::Blue,
        "dark_blue" => Color::DarkBlue,
        "magenta" => Color::Magenta,
        "dark_magenta" => Color::DarkMagenta,
        "cyan" => Color::Cyan,
        "dark_cyan" => Color::DarkCyan,
        "white" => Color::White,
        "grey" | "gray" => Color::Grey,
        "dark_grey" | "dark_gray" => Color::DarkGrey,
        _ => return None,
    };
    Some(color)
}

pub struct TerminalSurface {
    label: String,
    out: Sink,
    err: Sink,
    next_id: AtomicU64,
    /// Live highlight decorations by id, value is the highlighted line.
    highlights: Mutex<HashMap<DecorationId, usize>>,
}

impl TerminalSurface {
    pub fn stdio(label: impl Into<String>) -> Self {
        Self::with_writers(label, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_writers(
        label: impl Into<String>,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            label: label.into(),
            out: Mutex::new(out),
            err: Mutex::new(err),
            next_id: AtomicU64::new(1),
            highlights: Mutex::new(HashMap::new()),
        }
    }

    fn is_highlighted(&self, line: usize) -> bool {
        self.highlights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|&l| l == line)
    }

    fn print_inline(&self, line: usize, text: &str, color: &str) -> io::Result<()> {
        let bold = self.is_highlighted(line);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(color) = parse_color(color) {
            queue!(out, SetForegroundColor(color))?;
        }
        if bold {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        queue!(
            out,
            Print(format!("{}:{}{}", self.label, line + 1, text)),
            SetAttribute(Attribute::Reset),
            ResetColor,
            Print("\n")
        )?;
        out.flush()
    }
}

impl AnnotationSurface for TerminalSurface {
    fn apply(&self, editor: EditorId, decoration: &Decoration) -> DecorationId {
        let id = DecorationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match decoration {
            Decoration::Highlight { line, .. } => {
                self.highlights
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(id, *line);
            }
            Decoration::Inline {
                line, text, color, ..
            } => {
                if let Err(e) = self.print_inline(*line, text, color) {
                    warn!(target: "live.present", %editor, ?e, "terminal_write_failed");
                }
            }
        }
        trace!(target: "live.present", %editor, id = id.0, line = decoration.line(), "decoration_applied");
        id
    }

    fn remove(&self, editor: EditorId, id: DecorationId) {
        self.highlights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        trace!(target: "live.present", %editor, id = id.0, "decoration_removed");
    }

    fn alert(&self, editor: EditorId, message: &str) {
        let mut err = self.err.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(err, "{}", message.trim_end()).and_then(|_| err.flush()) {
            warn!(target: "live.present", %editor, ?e, "terminal_alert_failed");
        }
    }
}
