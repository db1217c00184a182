//! Per-editor live session.
//!
//! A `LiveSession` owns all per-editor state: the debounce timer, the active
//! annotations and the handle of the in-flight run. Pipeline per fire:
//!
//! `snapshot -> classify -> extract -> run -> reconcile -> present`
//!
//! The snapshot is taken from the session's own `EditorHandle` at fire time,
//! never from "whatever editor is focused now", so a run always lands on the
//! editor that produced it.
//!
//! Phase transitions:
//! `Idle -> Pending -> Running -> AnnotatedOutput | AnnotatedError`, and
//! `Pending -> Idle` when the classifier rejects the cursor line. A new
//! trigger moves any phase back to `Pending`.
//!
//! Under `SupersedePolicy::Finish` a superseded run still presents when it
//! completes (last writer wins). If nothing newer is pending or running at
//! that point, the phase follows what it presented; otherwise the phase is
//! left to the newer run. Under `SupersedePolicy::Cancel` every newer fire
//! aborts the in-flight run, so no superseded result is ever presented.

use crate::annotation::{Annotation, AnnotationKind};
use crate::classify::LineClassifier;
use crate::present::{AnnotationPresenter, AnnotationSurface};
use crate::reconcile::{AnnotationColors, reconcile};
use crate::runner::ProcessRunner;
use crate::snippet::{ExecutionRequest, extract};
use crate::trigger::TriggerAggregator;
use core_config::{LiveConfig, SupersedePolicy};
use core_events::{EditorId, RUNS_CANCELLED, RUNS_STARTED};
use core_text::EditorSnapshot;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, trace};

/// Read-only view of one editor, implemented by the host.
pub trait EditorHandle: Send + Sync + 'static {
    fn id(&self) -> EditorId;
    /// Current document text and cursor line.
    fn snapshot(&self) -> EditorSnapshot;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Pending,
    Running,
    AnnotatedOutput,
    AnnotatedError,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub debounce: Duration,
    pub colors: AnnotationColors,
    pub on_supersede: SupersedePolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&LiveConfig::default())
    }
}

impl SessionSettings {
    pub fn from_config(live: &LiveConfig) -> Self {
        Self {
            debounce: live.debounce(),
            colors: AnnotationColors::from_config(live),
            on_supersede: live.on_supersede,
        }
    }
}

struct SessionState {
    phase: SessionPhase,
    presenter: AnnotationPresenter,
    in_flight: Option<AbortHandle>,
    /// Bumped on every fire; only the newest run may move the phase.
    generation: u64,
    disposed: bool,
}

struct SessionShared {
    editor: Arc<dyn EditorHandle>,
    classifier: Arc<dyn LineClassifier>,
    runner: Arc<dyn ProcessRunner>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
}

impl SessionShared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Debounce elapsed: capture the editor and either clear or start a run.
    fn fire(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let id = self.editor.id();
        let snapshot = self.editor.snapshot();
        let line_text = snapshot.cursor_line_text();
        let mut state = self.lock();
        if state.disposed {
            return None;
        }
        state.generation += 1;

        // Every newer fire supersedes, including one that ends up clearing.
        if self.settings.on_supersede == SupersedePolicy::Cancel
            && let Some(previous) = state.in_flight.take()
            && !previous.is_finished()
        {
            previous.abort();
            RUNS_CANCELLED.fetch_add(1, Ordering::Relaxed);
            debug!(target: "live.session", editor = %id, "in_flight_run_cancelled");
        }

        if !self.classifier.should_evaluate(&line_text) {
            trace!(target: "live.classify", editor = %id, line = snapshot.cursor_line, "line_rejected");
            state
                .presenter
                .present(&Annotation::none(snapshot.cursor_line), &snapshot.document);
            state.phase = SessionPhase::Idle;
            return None;
        }

        let request = extract(&snapshot.document.text(), snapshot.cursor_line);
        state.phase = SessionPhase::Running;
        RUNS_STARTED.fetch_add(1, Ordering::Relaxed);
        debug!(
            target: "live.session",
            editor = %id,
            line = request.target_line(),
            snippet_bytes = request.source().len(),
            "run_started"
        );
        let handle = tokio::spawn(self.clone().run(request, state.generation));
        state.in_flight = Some(handle.abort_handle());
        Some(handle)
    }

    async fn run(self: Arc<Self>, request: ExecutionRequest, generation: u64) {
        let result = self.runner.run(&request).await;
        let reconciliation = reconcile(&result, request.target_line(), &self.settings.colors);
        // Validate against the document as it is now, not as it was at fire time.
        let snapshot = self.editor.snapshot();

        let mut state = self.lock();
        let stale = generation != state.generation;
        if state.disposed || (stale && self.settings.on_supersede == SupersedePolicy::Cancel) {
            return;
        }
        let shown = state
            .presenter
            .present(&reconciliation.annotation, &snapshot.document);
        if let Some(alert) = reconciliation.alert.as_deref() {
            state.presenter.alert(alert);
        }
        let settled = !matches!(state.phase, SessionPhase::Pending | SessionPhase::Running);
        if (!stale && state.phase == SessionPhase::Running) || (stale && settled && shown) {
            state.phase = match (shown, reconciliation.annotation.kind) {
                (true, AnnotationKind::Error) => SessionPhase::AnnotatedError,
                (true, _) => SessionPhase::AnnotatedOutput,
                (false, _) => SessionPhase::Idle,
            };
        }
        debug!(
            target: "live.session",
            editor = %self.editor.id(),
            kind = reconciliation.annotation.kind.as_str(),
            line = reconciliation.annotation.line,
            shown,
            stale,
            "run_presented"
        );
    }
}

pub struct LiveSession {
    shared: Arc<SessionShared>,
    trigger: TriggerAggregator,
}

impl LiveSession {
    pub fn new(
        editor: Arc<dyn EditorHandle>,
        surface: Arc<dyn AnnotationSurface>,
        classifier: Arc<dyn LineClassifier>,
        runner: Arc<dyn ProcessRunner>,
        settings: SessionSettings,
    ) -> Self {
        let presenter = AnnotationPresenter::new(editor.id(), surface);
        let trigger = TriggerAggregator::new(settings.debounce);
        Self {
            shared: Arc::new(SessionShared {
                editor,
                classifier,
                runner,
                settings,
                state: Mutex::new(SessionState {
                    phase: SessionPhase::Idle,
                    presenter,
                    in_flight: None,
                    generation: 0,
                    disposed: false,
                }),
            }),
            trigger,
        }
    }

    pub fn id(&self) -> EditorId {
        self.shared.editor.id()
    }

    /// Text or selection changed: restart the settle period.
    pub fn notify(&mut self) {
        {
            let mut state = self.shared.lock();
            if state.disposed {
                return;
            }
            state.phase = SessionPhase::Pending;
        }
        let shared = self.shared.clone();
        self.trigger.schedule(move || {
            let _ = shared.fire();
        });
    }

    /// Skip the settle period: evaluate now and wait for the annotation.
    pub async fn evaluate_now(&mut self) {
        self.trigger.cancel();
        if let Some(handle) = self.shared.fire()
            && let Err(err) = handle.await
        {
            debug!(target: "live.session", editor = %self.id(), ?err, "run_join_failed");
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.shared.lock().phase
    }

    pub fn is_pending(&self) -> bool {
        self.trigger.is_pending()
    }

    pub fn active(&self, kind: AnnotationKind) -> Option<Annotation> {
        self.shared.lock().presenter.active(kind).cloned()
    }

    /// Stop the timer, abort any in-flight run and remove all annotations.
    pub fn dispose(&mut self) {
        self.trigger.cancel();
        let mut state = self.shared.lock();
        if let Some(run) = state.in_flight.take() {
            run.abort();
        }
        state.presenter.clear();
        state.phase = SessionPhase::Idle;
        state.disposed = true;
        debug!(target: "live.session", editor = %self.shared.editor.id(), "session_disposed");
    }
}
