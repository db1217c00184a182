//! Live execution pipeline.
//!
//! Re-runs a script up to the cursor line in a background interpreter and
//! annotates that line with its last output or error.
//!
//! Leaves first:
//! - `trigger`: debounce of edit / cursor events (`TriggerAggregator`).
//! - `classify`: whether the cursor line is worth running (`LineClassifier`).
//! - `snippet`: document prefix through the cursor line (`extract`).
//! - `runner`: transient file + interpreter subprocess (`ProcessRunner`).
//! - `reconcile`: output / error decision (`reconcile`).
//! - `present`: decoration bookkeeping against the host (`AnnotationPresenter`).
//! - `session`: per-editor wiring and state machine (`LiveSession`).
//! - `host`: per-editor session registry and focus routing (`LiveHost`).
//!
//! The editor buffer, the rendering surface and the interpreter are external;
//! they enter through `EditorHandle`, `AnnotationSurface` and the
//! interpreter path respectively.

pub mod annotation;
pub mod classify;
pub mod host;
pub mod present;
pub mod reconcile;
pub mod runner;
pub mod session;
pub mod snippet;
pub mod trigger;

pub use annotation::{Annotation, AnnotationKind, Decoration, DecorationId};
pub use classify::{CallShapeClassifier, LineClassifier};
pub use host::{LiveHost, Routed};
pub use present::{AnnotationPresenter, AnnotationSurface};
pub use reconcile::{AnnotationColors, Reconciliation, reconcile};
pub use runner::{ExecutionResult, InterpreterRunner, ProcessRunner, RunError, RunFuture};
pub use session::{EditorHandle, LiveSession, SessionPhase, SessionSettings};
pub use snippet::{ExecutionRequest, extract};
pub use trigger::TriggerAggregator;
