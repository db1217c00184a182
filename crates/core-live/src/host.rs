//! Multi-editor routing.
//!
//! `LiveHost` keeps one `LiveSession` per open editor and forwards editor
//! events to the right one. Text and selection changes only count for the
//! focused editor; events from background editors are ignored.

use crate::classify::{CallShapeClassifier, LineClassifier};
use crate::present::AnnotationSurface;
use crate::runner::ProcessRunner;
use crate::session::{EditorHandle, LiveSession, SessionSettings};
use core_events::{EditorEvent, EditorId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of routing one event, mostly useful for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Scheduled,
    IgnoredUnfocused,
    UnknownEditor,
    FocusChanged,
    Disposed,
}

pub struct LiveHost {
    sessions: HashMap<EditorId, LiveSession>,
    focused: Option<EditorId>,
    surface: Arc<dyn AnnotationSurface>,
    classifier: Arc<dyn LineClassifier>,
    runner: Arc<dyn ProcessRunner>,
    settings: SessionSettings,
}

impl LiveHost {
    pub fn new(
        surface: Arc<dyn AnnotationSurface>,
        runner: Arc<dyn ProcessRunner>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            focused: None,
            surface,
            classifier: Arc::new(CallShapeClassifier::default()),
            runner,
            settings,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn LineClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Register an editor. The first opened editor becomes focused.
    pub fn open(&mut self, editor: Arc<dyn EditorHandle>) -> EditorId {
        let id = editor.id();
        let session = LiveSession::new(
            editor,
            self.surface.clone(),
            self.classifier.clone(),
            self.runner.clone(),
            self.settings.clone(),
        );
        if let Some(mut previous) = self.sessions.insert(id, session) {
            previous.dispose();
        }
        if self.focused.is_none() {
            self.focused = Some(id);
        }
        debug!(target: "live.host", editor = %id, "editor_opened");
        id
    }

    pub fn focused(&self) -> Option<EditorId> {
        self.focused
    }

    pub fn session(&self, id: EditorId) -> Option<&LiveSession> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: EditorId) -> Option<&mut LiveSession> {
        self.sessions.get_mut(&id)
    }

    pub fn handle_event(&mut self, event: EditorEvent) -> Routed {
        let id = event.editor();
        if !self.sessions.contains_key(&id) {
            trace!(target: "live.host", editor = %id, event = event.as_str(), "unknown_editor");
            return Routed::UnknownEditor;
        }
        match event {
            EditorEvent::Focused { editor } => {
                self.focused = Some(editor);
                Routed::FocusChanged
            }
            EditorEvent::Closed { editor } => {
                if let Some(mut session) = self.sessions.remove(&editor) {
                    session.dispose();
                }
                if self.focused == Some(editor) {
                    self.focused = None;
                }
                Routed::Disposed
            }
            EditorEvent::TextChanged { editor } | EditorEvent::SelectionChanged { editor } => {
                if self.focused != Some(editor) {
                    trace!(target: "live.host", editor = %editor, event = event.as_str(), "ignored_unfocused");
                    return Routed::IgnoredUnfocused;
                }
                if let Some(session) = self.sessions.get_mut(&editor) {
                    session.notify();
                }
                Routed::Scheduled
            }
        }
    }

    /// Dispose every session.
    pub fn shutdown(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.dispose();
        }
        self.focused = None;
    }
}
