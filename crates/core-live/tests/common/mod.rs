#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_events::EditorId;
use core_live::{
    Decoration, DecorationId, EditorHandle, ExecutionRequest, ExecutionResult, LineClassifier,
    ProcessRunner, RunFuture, SessionSettings,
};
use core_text::{Document, EditorSnapshot};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

pub const DEBOUNCE: Duration = Duration::from_millis(300);

pub fn settings() -> SessionSettings {
    SessionSettings {
        debounce: DEBOUNCE,
        ..SessionSettings::default()
    }
}

/// In-memory editor: text and cursor mutable from the test body.
pub struct MemoryEditor {
    id: EditorId,
    state: Mutex<(String, usize)>,
}

impl MemoryEditor {
    pub fn new(id: u64, text: &str, cursor_line: usize) -> Self {
        Self {
            id: EditorId(id),
            state: Mutex::new((text.to_string(), cursor_line)),
        }
    }

    pub fn set_text(&self, text: &str) {
        self.state.lock().unwrap().0 = text.to_string();
    }

    pub fn set_cursor(&self, line: usize) {
        self.state.lock().unwrap().1 = line;
    }
}

impl EditorHandle for MemoryEditor {
    fn id(&self) -> EditorId {
        self.id
    }

    fn snapshot(&self) -> EditorSnapshot {
        let (text, cursor) = &*self.state.lock().unwrap();
        EditorSnapshot::new(Document::from_str(text), *cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub editor: EditorId,
    pub decoration: Decoration,
}

/// Surface that keeps every live decoration and every alert.
#[derive(Default)]
pub struct RecordingSurface {
    next: Mutex<u64>,
    live: Mutex<BTreeMap<u64, Applied>>,
    alerts: Mutex<Vec<(EditorId, String)>>,
}

impl RecordingSurface {
    pub fn live(&self) -> Vec<Applied> {
        self.live.lock().unwrap().values().cloned().collect()
    }

    pub fn live_for(&self, editor: EditorId) -> Vec<Decoration> {
        self.live()
            .into_iter()
            .filter(|a| a.editor == editor)
            .map(|a| a.decoration)
            .collect()
    }

    /// Inline texts visible in `editor`, in application order.
    pub fn inline_texts(&self, editor: EditorId) -> Vec<(usize, String)> {
        self.live_for(editor)
            .into_iter()
            .filter_map(|d| match d {
                Decoration::Inline { line, text, .. } => Some((line, text)),
                Decoration::Highlight { .. } => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<(EditorId, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

impl core_live::AnnotationSurface for RecordingSurface {
    fn apply(&self, editor: EditorId, decoration: &Decoration) -> DecorationId {
        let mut next = self.next.lock().unwrap();
        *next += 1;
        self.live.lock().unwrap().insert(
            *next,
            Applied {
                editor,
                decoration: decoration.clone(),
            },
        );
        DecorationId(*next)
    }

    fn remove(&self, _editor: EditorId, id: DecorationId) {
        self.live.lock().unwrap().remove(&id.0);
    }

    fn alert(&self, editor: EditorId, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((editor, message.to_string()));
    }
}

type Script = Box<dyn Fn(&ExecutionRequest) -> ExecutionResult + Send + Sync>;

/// Fake interpreter: answers each request through `script` after `latency`.
pub struct ScriptedRunner {
    script: Script,
    latency: Duration,
    seen: Mutex<Vec<ExecutionRequest>>,
    finished: Mutex<usize>,
}

impl ScriptedRunner {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&ExecutionRequest) -> ExecutionResult + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            latency: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
            finished: Mutex::new(0),
        }
    }

    /// Echo the last line of the snippet as stdout.
    pub fn echo() -> Self {
        Self::new(|req| {
            let last = req.source().trim_end().lines().last().unwrap_or("");
            ExecutionResult::success(format!("{last}\n"), "")
        })
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn finished(&self) -> usize {
        *self.finished.lock().unwrap()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run<'a>(&'a self, request: &'a ExecutionRequest) -> RunFuture<'a> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(request.clone());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            *self.finished.lock().unwrap() += 1;
            (self.script)(request)
        })
    }
}

/// Accepts every line, so real-interpreter tests can drive `sh` snippets.
pub struct AlwaysClassifier;

impl LineClassifier for AlwaysClassifier {
    fn should_evaluate(&self, line: &str) -> bool {
        !line.trim().is_empty()
    }
}

/// Let spawned tasks run until the runtime would otherwise advance time.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
