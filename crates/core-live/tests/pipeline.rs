//! End-to-end pipeline: snapshot -> classify -> extract -> run -> reconcile -> present.

mod common;

use common::{AlwaysClassifier, MemoryEditor, RecordingSurface, ScriptedRunner, settings};
use core_events::EditorId;
use core_live::{
    AnnotationKind, CallShapeClassifier, Decoration, ExecutionResult, LiveSession, SessionPhase,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const TRACEBACK: &str = "Traceback (most recent call last):\n  File \"/tmp/oxlive_snippet.py\", line 1, in <module>\n    print(1/0)\nZeroDivisionError: division by zero\n";

fn session(
    editor: Arc<MemoryEditor>,
    runner: Arc<ScriptedRunner>,
) -> (Arc<RecordingSurface>, LiveSession) {
    let surface = Arc::new(RecordingSurface::default());
    let session = LiveSession::new(
        editor,
        surface.clone(),
        Arc::new(CallShapeClassifier::default()),
        runner,
        settings(),
    );
    (surface, session)
}

#[tokio::test]
async fn print_on_cursor_line_annotates_last_output() {
    let editor = Arc::new(MemoryEditor::new(1, "x = 1\nprint(x)\n", 1));
    let runner = Arc::new(ScriptedRunner::new(|_| ExecutionResult::success("1\n", "")));
    let (surface, mut session) = session(editor, runner.clone());

    session.evaluate_now().await;

    let requests = runner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].source(), "x = 1\nprint(x)\n");
    assert_eq!(requests[0].target_line(), 1);
    assert_eq!(
        surface.live_for(EditorId(1)),
        vec![Decoration::Inline {
            line: 1,
            column: 8,
            text: " # Output: 1".into(),
            color: "grey".into(),
        }]
    );
    assert_eq!(session.phase(), SessionPhase::AnnotatedOutput);
    assert!(surface.alerts().is_empty());
}

#[tokio::test]
async fn traceback_highlights_referenced_line_and_alerts() {
    let editor = Arc::new(MemoryEditor::new(2, "print(1/0)\n", 0));
    let runner = Arc::new(ScriptedRunner::new(|_| ExecutionResult::success("", TRACEBACK)));
    let (surface, mut session) = session(editor, runner);

    session.evaluate_now().await;

    assert_eq!(
        surface.live_for(EditorId(2)),
        vec![
            Decoration::Highlight {
                line: 0,
                start: 0,
                end: 10,
                color: "red".into(),
            },
            Decoration::Inline {
                line: 0,
                column: 10,
                text: " # Error: ZeroDivisionError: division by zero".into(),
                color: "red".into(),
            },
        ]
    );
    assert_eq!(surface.alerts(), vec![(EditorId(2), TRACEBACK.to_string())]);
    assert_eq!(session.phase(), SessionPhase::AnnotatedError);
}

#[tokio::test]
async fn silent_snippet_shows_no_output_marker() {
    let editor = Arc::new(MemoryEditor::new(3, "foo()\n", 0));
    let runner = Arc::new(ScriptedRunner::new(|_| ExecutionResult::default()));
    let (surface, mut session) = session(editor, runner);

    session.evaluate_now().await;

    assert_eq!(
        surface.inline_texts(EditorId(3)),
        vec![(0, " # <No Output>".to_string())]
    );
}

#[tokio::test]
async fn rejected_line_clears_annotations_without_running() {
    let editor = Arc::new(MemoryEditor::new(4, "print(1)\ndef f():\n", 0));
    let runner = Arc::new(ScriptedRunner::new(|_| ExecutionResult::success("1\n", "")));
    let (surface, mut session) = session(editor.clone(), runner.clone());

    session.evaluate_now().await;
    assert_eq!(surface.live_for(EditorId(4)).len(), 1);

    editor.set_cursor(1);
    session.evaluate_now().await;

    assert!(surface.live_for(EditorId(4)).is_empty());
    assert_eq!(runner.requests().len(), 1, "block header never reaches the runner");
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn output_and_error_slots_are_independent() {
    let editor = Arc::new(MemoryEditor::new(5, "print(1)\nprint(1/0)\n", 0));
    let runner = Arc::new(ScriptedRunner::new(|req| {
        if req.target_line() == 0 {
            ExecutionResult::success("1\n", "")
        } else {
            ExecutionResult::success("1\n", "ZeroDivisionError: division by zero\n")
        }
    }));
    let (surface, mut session) = session(editor.clone(), runner);

    session.evaluate_now().await;
    editor.set_cursor(1);
    session.evaluate_now().await;

    assert_eq!(
        surface.inline_texts(EditorId(5)),
        vec![
            (0, " # Output: 1".to_string()),
            (1, " # Error: ZeroDivisionError: division by zero".to_string()),
        ]
    );
    assert!(session.active(AnnotationKind::Output).is_some());
    assert_eq!(
        session.active(AnnotationKind::Error).map(|a| a.line),
        Some(1)
    );
}

#[tokio::test]
async fn new_output_replaces_previous_output() {
    let editor = Arc::new(MemoryEditor::new(6, "print(1)\nprint(2)\n", 0));
    let runner = Arc::new(ScriptedRunner::echo());
    let (surface, mut session) = session(editor.clone(), runner);

    session.evaluate_now().await;
    editor.set_cursor(1);
    session.evaluate_now().await;

    assert_eq!(
        surface.inline_texts(EditorId(6)),
        vec![(1, " # Output: print(2)".to_string())]
    );
}

#[tokio::test]
async fn error_pointing_past_document_end_is_dropped() {
    let editor = Arc::new(MemoryEditor::new(7, "boom()\n", 0));
    let runner = Arc::new(ScriptedRunner::new(|_| {
        ExecutionResult::success("", "  File \"x.py\", line 40\nNameError: boom\n")
    }));
    let (surface, mut session) = session(editor, runner);

    session.evaluate_now().await;

    assert!(surface.live_for(EditorId(7)).is_empty());
    assert_eq!(surface.alerts().len(), 1, "full text is still surfaced");
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn dispose_removes_everything_and_ignores_later_evaluations() {
    let editor = Arc::new(MemoryEditor::new(8, "print(1)\n", 0));
    let runner = Arc::new(ScriptedRunner::echo());
    let (surface, mut session) = session(editor, runner.clone());

    session.evaluate_now().await;
    session.dispose();
    session.evaluate_now().await;

    assert!(surface.live().is_empty());
    assert_eq!(runner.requests().len(), 1);
}

#[cfg(unix)]
mod real_interpreter {
    use super::*;
    use crate::common::DEBOUNCE;
    use core_live::InterpreterRunner;
    use std::time::Duration;
    use pretty_assertions::assert_eq;

    fn sh_session(editor: Arc<MemoryEditor>, dir: &tempfile::TempDir) -> (Arc<RecordingSurface>, LiveSession) {
        let surface = Arc::new(RecordingSurface::default());
        let runner = InterpreterRunner::new("sh", dir.path().join("snippet.sh"));
        let session = LiveSession::new(
            editor,
            surface.clone(),
            Arc::new(AlwaysClassifier),
            Arc::new(runner),
            settings(),
        );
        (surface, session)
    }

    #[tokio::test]
    async fn shell_prefix_runs_through_cursor_line() {
        let dir = tempfile::tempdir().unwrap();
        let editor = Arc::new(MemoryEditor::new(20, "echo one\necho two\necho three\n", 1));
        let (surface, mut session) = sh_session(editor, &dir);

        session.evaluate_now().await;

        assert_eq!(
            surface.inline_texts(EditorId(20)),
            vec![(1, " # Output: two".to_string())]
        );
        assert!(!dir.path().join("snippet.sh").exists(), "scratch file is removed");
    }

    #[tokio::test]
    async fn shell_stderr_becomes_error_annotation() {
        let dir = tempfile::tempdir().unwrap();
        let editor = Arc::new(MemoryEditor::new(21, "echo ok\necho boom >&2\n", 1));
        let (surface, mut session) = sh_session(editor, &dir);

        session.evaluate_now().await;

        assert_eq!(
            surface.inline_texts(EditorId(21)),
            vec![(1, " # Error: boom".to_string())]
        );
        assert_eq!(session.phase(), SessionPhase::AnnotatedError);
    }

    #[tokio::test]
    async fn dispose_mid_run_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("snippet.sh");
        let editor = Arc::new(MemoryEditor::new(22, "sleep 2\n", 0));
        let (surface, mut session) = sh_session(editor, &dir);

        session.notify();
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(200)).await;
        assert_eq!(session.phase(), SessionPhase::Running);
        assert!(scratch.exists(), "interpreter is still running");

        session.dispose();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!scratch.exists(), "aborted run removes its scratch file");
        assert!(surface.live_for(EditorId(22)).is_empty());
    }
}
