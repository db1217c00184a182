//! Annotation presenter: owns the active Output and Error annotations of one
//! editor and drives the host's `AnnotationSurface`.
//!
//! Invariants:
//! * At most one active annotation per kind. A new annotation removes every
//!   decoration of the previous one of the same kind before applying its own.
//! * The other kind is untouched by `present`; only `clear` removes both.
//! * An annotation whose line is outside the current document is dropped
//!   after the old one of its kind has been removed.

use crate::annotation::{Annotation, AnnotationKind, Decoration, DecorationId};
use core_events::{ANNOTATIONS_DROPPED, EditorId};
use core_text::Document;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, trace};

/// Presentation boundary implemented by the host editor.
pub trait AnnotationSurface: Send + Sync + 'static {
    fn apply(&self, editor: EditorId, decoration: &Decoration) -> DecorationId;
    fn remove(&self, editor: EditorId, id: DecorationId);
    /// Out-of-line notification (toast, modal, stderr) carrying full error text.
    fn alert(&self, editor: EditorId, message: &str);
}

#[derive(Debug)]
struct ActiveAnnotation {
    annotation: Annotation,
    decorations: Vec<DecorationId>,
}

pub struct AnnotationPresenter {
    editor: EditorId,
    surface: Arc<dyn AnnotationSurface>,
    output: Option<ActiveAnnotation>,
    error: Option<ActiveAnnotation>,
}

impl AnnotationPresenter {
    pub fn new(editor: EditorId, surface: Arc<dyn AnnotationSurface>) -> Self {
        Self {
            editor,
            surface,
            output: None,
            error: None,
        }
    }

    /// Replace the active annotation of `annotation.kind`. A `None` kind clears
    /// everything. Returns whether the annotation is now visible.
    pub fn present(&mut self, annotation: &Annotation, document: &Document) -> bool {
        let slot = match annotation.kind {
            AnnotationKind::None => {
                self.clear();
                return false;
            }
            AnnotationKind::Output => &mut self.output,
            AnnotationKind::Error => &mut self.error,
        };
        if let Some(old) = slot.take() {
            for id in old.decorations {
                self.surface.remove(self.editor, id);
            }
        }

        let line = annotation.line;
        if !document.is_valid_line(line) {
            ANNOTATIONS_DROPPED.fetch_add(1, Ordering::Relaxed);
            debug!(
                target: "live.present",
                editor = %self.editor,
                kind = annotation.kind.as_str(),
                line,
                line_count = document.line_count(),
                "annotation_dropped_invalid_line"
            );
            return false;
        }

        let line_len = document.line_len(line);
        let mut decorations = Vec::with_capacity(2);
        if annotation.kind == AnnotationKind::Error {
            let highlight = Decoration::Highlight {
                line,
                start: 0,
                end: line_len,
                color: annotation.color.clone(),
            };
            decorations.push(self.surface.apply(self.editor, &highlight));
        }
        let text = annotation.text.trim();
        if !text.is_empty() {
            let inline = Decoration::Inline {
                line,
                column: line_len,
                text: format!(" # {text}"),
                color: annotation.color.clone(),
            };
            decorations.push(self.surface.apply(self.editor, &inline));
        }
        trace!(
            target: "live.present",
            editor = %self.editor,
            kind = annotation.kind.as_str(),
            line,
            decorations = decorations.len(),
            "annotation_applied"
        );
        *slot = Some(ActiveAnnotation {
            annotation: annotation.clone(),
            decorations,
        });
        true
    }

    pub fn alert(&self, message: &str) {
        self.surface.alert(self.editor, message);
    }

    /// Remove both kinds. No-op when nothing is active.
    pub fn clear(&mut self) {
        for active in [self.output.take(), self.error.take()].into_iter().flatten() {
            for id in active.decorations {
                self.surface.remove(self.editor, id);
            }
        }
    }

    pub fn active(&self, kind: AnnotationKind) -> Option<&Annotation> {
        let slot = match kind {
            AnnotationKind::Output => &self.output,
            AnnotationKind::Error => &self.error,
            AnnotationKind::None => return None,
        };
        slot.as_ref().map(|a| &a.annotation)
    }

    /// Number of decorations currently applied through the surface.
    pub fn decoration_count(&self) -> usize {
        [&self.output, &self.error]
            .into_iter()
            .flatten()
            .map(|a| a.decorations.len())
            .sum()
    }
}
