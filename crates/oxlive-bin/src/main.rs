//! oxlive entrypoint.
//!
//! Treats a script file as the editor: evaluates it up to the cursor line and
//! prints the resulting annotation. With `--watch` every save re-runs it after
//! the configured settle period until Ctrl-C.
mod editor;
mod surface;
mod watch;

use anyhow::{Context, Result};
use clap::Parser;
use core_config::{Config, load_from};
use core_events::{EVENT_CHANNEL_CAP, EditorId, Event, EventSourceRegistry, telemetry_snapshot};
use core_live::{InterpreterRunner, LiveHost, Routed, SessionSettings};
use editor::FileEditor;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;
use surface::TerminalSurface;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use watch::{CtrlCSource, FileWatchSource};

const LOG_FILE: &str = "oxlive.log";
const SCRIPT_EDITOR: EditorId = EditorId(1);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "oxlive", version, about = "Inline results for the line you are on")]
struct Args {
    /// Script to evaluate.
    pub script: PathBuf,
    /// Cursor line (0-based). Defaults to the last non-blank line.
    #[arg(long = "line")]
    pub line: Option<usize>,
    /// Optional configuration file path (overrides discovery of `oxlive.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Keep running and re-evaluate on every save.
    #[arg(long = "watch")]
    pub watch: bool,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

struct RuntimeContext {
    args: Args,
    config: Config,
    runner: InterpreterRunner,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn run(&mut self) -> Result<RuntimeContext> {
        self.configure_logging()?;
        Self::install_panic_hook();

        info!(target: "runtime", "startup");
        let args = Args::parse();
        let config = load_from(args.config.clone())?;
        let runner = InterpreterRunner::from_config(&config, Some(&workspace_root(&args.script)));
        config.log_effective(runner.interpreter());

        info!(
            target: "runtime.startup",
            script = %args.script.display(),
            line = ?args.line,
            watch = args.watch,
            config_override = args.config.is_some(),
            "bootstrap_complete"
        );
        Ok(RuntimeContext {
            args,
            config,
            runner,
        })
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join(LOG_FILE);
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        if tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .with_ansi(false)
            .try_init()
            .is_ok()
        {
            self.log_guard = Some(guard);
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

/// Directory searched for `.venv`: the script's own directory.
fn workspace_root(script: &Path) -> PathBuf {
    match script.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn display_label(script: &Path) -> String {
    script
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("script")
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    OneShot,
    ShutdownEvent,
    ChannelClosed,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::OneShot => "one_shot",
            ShutdownReason::ShutdownEvent => "shutdown_event",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

struct LiveRuntime {
    host: LiveHost,
    editor: EditorId,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<JoinHandle<()>>,
}

impl LiveRuntime {
    fn new(
        host: LiveHost,
        editor: EditorId,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        source_handles: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            host,
            editor,
            rx,
            tx: Some(tx),
            source_handles,
        }
    }

    async fn evaluate_now(&mut self) {
        if let Some(session) = self.host.session_mut(self.editor) {
            session.evaluate_now().await;
        }
    }

    /// Watch mode: initial evaluation, then route events until shutdown.
    async fn run(&mut self) -> Result<()> {
        self.evaluate_now().await;

        let span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter = span.enter();

        let mut reason = ShutdownReason::ChannelClosed;
        while let Some(event) = self.rx.recv().await {
            match event {
                Event::Editor(ev) => {
                    let routed = self.host.handle_event(ev);
                    trace!(target: "runtime", event = ev.as_str(), ?routed, "event_routed");
                    if routed == Routed::Disposed && self.host.focused().is_none() {
                        reason = ShutdownReason::ShutdownEvent;
                        break;
                    }
                }
                Event::Shutdown => {
                    reason = ShutdownReason::ShutdownEvent;
                    break;
                }
            }
        }

        self.rx.close();
        self.finalize_shutdown(reason).await;
        Ok(())
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        if let Some(tx) = self.tx.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "dropping_runtime_sender"
            );
            drop(tx);
        }

        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_timeout"
                ),
            }
        }

        self.host.shutdown();
        let t = telemetry_snapshot();
        info!(
            target: "runtime.shutdown",
            triggers_scheduled = t.triggers_scheduled,
            triggers_superseded = t.triggers_superseded,
            triggers_fired = t.triggers_fired,
            runs_started = t.runs_started,
            runs_cancelled = t.runs_cancelled,
            annotations_dropped = t.annotations_dropped,
            channel_send_failures = t.channel_send_failures,
            "telemetry"
        );
        log_shutdown_stage(reason, "complete");
    }
}

fn build_host(context: &RuntimeContext) -> Result<(LiveHost, EditorId)> {
    let script = &context.args.script;
    if !script.is_file() {
        anyhow::bail!("script not found: {}", script.display());
    }
    let script = script
        .canonicalize()
        .with_context(|| format!("resolving {}", script.display()))?;

    let surface = Arc::new(TerminalSurface::stdio(display_label(&script)));
    let mut host = LiveHost::new(
        surface,
        Arc::new(context.runner.clone()),
        SessionSettings::from_config(context.config.live()),
    );
    let id = host.open(Arc::new(FileEditor::new(
        SCRIPT_EDITOR,
        script,
        context.args.line,
    )));
    Ok((host, id))
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    let context = startup.run()?;
    let (host, editor) = build_host(&context)?;

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut registry = EventSourceRegistry::new();
    if context.args.watch {
        let script = context.args.script.canonicalize()?;
        registry.register(FileWatchSource::new(editor, script));
        registry.register(CtrlCSource);
    }
    let source_handles = registry.spawn_all(&tx);

    let mut runtime = LiveRuntime::new(host, editor, tx, rx, source_handles);
    if context.args.watch {
        runtime.run().await
    } else {
        runtime.evaluate_now().await;
        runtime.finalize_shutdown(ShutdownReason::OneShot).await;
        Ok(())
    }
}
