//! Core event types and channel helpers for oxlive.
//!
//! The host translates whatever its editor reports (keystrokes, cursor moves,
//! file saves) into `EditorEvent`s and pushes them through one bounded channel
//! consumed by the runtime loop. The pipeline itself never reads from the
//! channel; it only sees `EditorEvent`s routed to it by the host.

use std::fmt;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// Bounded mpsc channel sized by `EVENT_CHANNEL_CAP`. Producers running on foreign threads (file
// watchers) use `try_send` and count drops in `CHANNEL_SEND_FAILURES`; losing a burst of change
// notifications is harmless because the debounce only needs the last one.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 1024;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters, inspected in tests or logged at shutdown.
// -------------------------------------------------------------------------------------------------
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static TRIGGERS_SCHEDULED: AtomicU64 = AtomicU64::new(0);
pub static TRIGGERS_SUPERSEDED: AtomicU64 = AtomicU64::new(0); // pending trigger replaced before firing
pub static TRIGGERS_FIRED: AtomicU64 = AtomicU64::new(0);
pub static RUNS_STARTED: AtomicU64 = AtomicU64::new(0);
pub static RUNS_CANCELLED: AtomicU64 = AtomicU64::new(0); // aborted under the cancel supersede policy
pub static ANNOTATIONS_DROPPED: AtomicU64 = AtomicU64::new(0); // target line outside the document

/// Snapshot of the telemetry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub channel_send_failures: u64,
    pub triggers_scheduled: u64,
    pub triggers_superseded: u64,
    pub triggers_fired: u64,
    pub runs_started: u64,
    pub runs_cancelled: u64,
    pub annotations_dropped: u64,
}

pub fn telemetry_snapshot() -> TelemetrySnapshot {
    use std::sync::atomic::Ordering::Relaxed;
    TelemetrySnapshot {
        channel_send_failures: CHANNEL_SEND_FAILURES.load(Relaxed),
        triggers_scheduled: TRIGGERS_SCHEDULED.load(Relaxed),
        triggers_superseded: TRIGGERS_SUPERSEDED.load(Relaxed),
        triggers_fired: TRIGGERS_FIRED.load(Relaxed),
        runs_started: RUNS_STARTED.load(Relaxed),
        runs_cancelled: RUNS_CANCELLED.load(Relaxed),
        annotations_dropped: ANNOTATIONS_DROPPED.load(Relaxed),
    }
}

/// Opaque identity of one editor (one open view onto a document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(pub u64);

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "editor#{}", self.0)
    }
}

/// Notifications a host forwards from its editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    /// Document text of `editor` changed.
    TextChanged { editor: EditorId },
    /// Cursor or selection of `editor` moved.
    SelectionChanged { editor: EditorId },
    /// `editor` became the focused editor.
    Focused { editor: EditorId },
    /// `editor` was closed; its session must be disposed.
    Closed { editor: EditorId },
}

impl EditorEvent {
    pub fn editor(&self) -> EditorId {
        match *self {
            EditorEvent::TextChanged { editor }
            | EditorEvent::SelectionChanged { editor }
            | EditorEvent::Focused { editor }
            | EditorEvent::Closed { editor } => editor,
        }
    }

    /// Text and selection changes are the only events that schedule a trigger.
    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            EditorEvent::TextChanged { .. } | EditorEvent::SelectionChanged { .. }
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EditorEvent::TextChanged { .. } => "text_changed",
            EditorEvent::SelectionChanged { .. } => "selection_changed",
            EditorEvent::Focused { .. } => "focused",
            EditorEvent::Closed { .. } => "closed",
        }
    }
}

/// Top-level event enum consumed by the host's event loop.
#[derive(Debug, Clone)]
pub enum Event {
    Editor(EditorEvent),
    Shutdown,
}

// -------------------------------------------------------------------------------------------------
// Async Event Sources
// -------------------------------------------------------------------------------------------------
// Producers (file watchers, editor bridges) register uniformly. Each source owns its async task
// lifecycle; on channel send failure (consumer dropped) it must terminate promptly.

/// Trait implemented by any async event producer. Implementors usually hold configuration and
/// spawn one background task that pushes `Event`s into the shared channel.
pub trait AsyncEventSource: Send + 'static {
    /// Human-readable stable identifier (used for logging / diagnostics).
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task, returning a JoinHandle. Implementors should
    /// stop when the channel is closed or on their own internal stop condition.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources spawned together at startup.
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources, returning their JoinHandles. Each source receives its own
    /// clone of `tx`; during shutdown the caller should drop its final `Sender` before awaiting
    /// the handles so the sources observe the closed channel and exit cooperatively.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        // Drain so a second call cannot spawn duplicates.
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct MockOnceSource {
        editor: EditorId,
    }

    impl AsyncEventSource for MockOnceSource {
        fn name(&self) -> &'static str {
            "mock_once"
        }
        fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
            tokio::spawn(async move {
                let _ = tx
                    .send(Event::Editor(EditorEvent::TextChanged {
                        editor: self.editor,
                    }))
                    .await;
            })
        }
    }

    struct MockCloseSource {
        flag: Arc<AtomicBool>,
    }

    impl AsyncEventSource for MockCloseSource {
        fn name(&self) -> &'static str {
            "mock_close"
        }

        fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
            let flag = self.flag;
            tokio::spawn(async move {
                tx.closed().await;
                flag.store(true, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn registry_spawns_and_emits() {
        let (tx, mut rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        reg.register(MockOnceSource {
            editor: EditorId(7),
        });
        assert_eq!(reg.len(), 1);
        let handles = reg.spawn_all(&tx);
        assert!(reg.is_empty(), "spawn_all drains the registry");

        let ev = tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("source should emit promptly")
            .expect("channel open");
        match ev {
            Event::Editor(e) => {
                assert_eq!(e.editor(), EditorId(7));
                assert!(e.is_trigger());
            }
            other => panic!("unexpected event {other:?}"),
        }
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_millis(20), handle).await;
        }
    }

    #[tokio::test]
    async fn registry_sources_exit_on_channel_drop() {
        let (tx, rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        let flag = Arc::new(AtomicBool::new(false));
        reg.register(MockCloseSource { flag: flag.clone() });
        let handles = reg.spawn_all(&tx);

        drop(tx);
        drop(rx);

        for handle in handles {
            match tokio::time::timeout(Duration::from_millis(50), handle).await {
                Ok(join_res) => join_res.expect("source task should exit cleanly"),
                Err(_) => panic!("source task did not observe channel closure"),
            }
        }

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn only_text_and_selection_events_trigger() {
        let id = EditorId(1);
        assert!(EditorEvent::TextChanged { editor: id }.is_trigger());
        assert!(EditorEvent::SelectionChanged { editor: id }.is_trigger());
        assert!(!EditorEvent::Focused { editor: id }.is_trigger());
        assert!(!EditorEvent::Closed { editor: id }.is_trigger());
        assert_eq!(EditorEvent::Closed { editor: id }.as_str(), "closed");
    }

    #[test]
    fn editor_id_display() {
        assert_eq!(EditorId(3).to_string(), "editor#3");
    }
}
