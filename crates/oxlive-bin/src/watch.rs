//! Event sources feeding the runtime channel.

use core_events::{AsyncEventSource, CHANNEL_SEND_FAILURES, EditorEvent, EditorId, Event};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{error, info, trace};

/// Emits `TextChanged` for `editor` whenever the script file is written.
///
/// Watches the parent directory rather than the file itself so editors that
/// save by rename-and-replace keep producing events.
pub struct FileWatchSource {
    editor: EditorId,
    path: PathBuf,
}

impl FileWatchSource {
    pub fn new(editor: EditorId, path: impl Into<PathBuf>) -> Self {
        Self {
            editor,
            path: path.into(),
        }
    }
}

fn touches(event: &notify::Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

fn forward(tx: &Sender<Event>, editor: EditorId) {
    match tx.try_send(Event::Editor(EditorEvent::TextChanged { editor })) {
        Ok(()) => trace!(target: "runtime.events", %editor, "file_change_forwarded"),
        Err(TrySendError::Full(_)) => {
            CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
        }
        Err(TrySendError::Closed(_)) => {}
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl AsyncEventSource for FileWatchSource {
    fn name(&self) -> &'static str {
        "file_watch"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let Some(file_name) = self.path.file_name().map(|n| n.to_os_string()) else {
                error!(target: "runtime.events", path = %self.path.display(), "watch_path_has_no_file_name");
                return;
            };
            let dir = watch_dir(&self.path);
            let editor = self.editor;
            let cb_tx = tx.clone();
            let watcher = RecommendedWatcher::new(
                move |res: notify::Result<notify::Event>| match res {
                    Ok(event) if touches(&event, &file_name) => forward(&cb_tx, editor),
                    Ok(_) => {}
                    Err(e) => trace!(target: "runtime.events", ?e, "watch_error"),
                },
                Config::default(),
            );
            let mut watcher = match watcher {
                Ok(w) => w,
                Err(e) => {
                    error!(target: "runtime.events", ?e, "watcher_create_failed");
                    return;
                }
            };
            if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
                error!(target: "runtime.events", dir = %dir.display(), ?e, "watch_failed");
                return;
            }
            info!(target: "runtime.events", dir = %dir.display(), %editor, "watching");
            // Keep the watcher alive until the runtime stops receiving.
            tx.closed().await;
            drop(watcher);
        })
    }
}

/// Translates Ctrl-C into `Event::Shutdown`.
pub struct CtrlCSource;

impl AsyncEventSource for CtrlCSource {
    fn name(&self) -> &'static str {
        "ctrl_c"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        error!(target: "runtime.events", ?e, "ctrl_c_listener_failed");
                        return;
                    }
                    info!(target: "runtime.events", "ctrl_c");
                    let _ = tx.send(Event::Shutdown).await;
                }
                _ = tx.closed() => {}
            }
        })
    }
}
