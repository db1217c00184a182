//! Map one `ExecutionResult` to a single display decision.
//!
//! Error text is, in order: the runner's failure message, stderr when
//! non-empty, stdout when it mentions `Error`. Anything else is output. Only
//! the last line is shown inline because the whole prefix re-runs on every
//! trigger; earlier prints belong to earlier lines.

use crate::annotation::Annotation;
use crate::runner::ExecutionResult;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static LINE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"line (\d+)").expect("line reference pattern"));

pub const NO_OUTPUT: &str = "<No Output>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationColors {
    pub output: String,
    pub error: String,
}

impl Default for AnnotationColors {
    fn default() -> Self {
        Self {
            output: "grey".to_string(),
            error: "red".to_string(),
        }
    }
}

impl AnnotationColors {
    pub fn from_config(live: &core_config::LiveConfig) -> Self {
        Self {
            output: live.output_color.clone(),
            error: live.error_color.clone(),
        }
    }
}

/// Inline annotation plus the optional out-of-line alert carrying the full,
/// untrimmed error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub annotation: Annotation,
    pub alert: Option<String>,
}

fn error_text(result: &ExecutionResult) -> Option<&str> {
    if let Some(failure) = result.failure.as_deref().filter(|f| !f.is_empty()) {
        return Some(failure);
    }
    if !result.stderr.is_empty() {
        return Some(&result.stderr);
    }
    result
        .stdout
        .contains("Error")
        .then_some(result.stdout.as_str())
}

fn last_line(text: &str) -> &str {
    let trimmed = text.trim();
    let last = trimmed.rsplit('\n').next().unwrap_or(trimmed);
    last.trim_end_matches('\r')
}

/// First `line <N>` reference converted to a 0-based editor line.
fn referenced_line(text: &str) -> Option<usize> {
    let caps = LINE_REF.captures(text)?;
    let n: usize = caps.get(1)?.as_str().parse().ok()?;
    n.checked_sub(1)
}

pub fn reconcile(
    result: &ExecutionResult,
    fallback_line: usize,
    colors: &AnnotationColors,
) -> Reconciliation {
    if let Some(err) = error_text(result) {
        let line = referenced_line(err).unwrap_or(fallback_line);
        let concise = last_line(err);
        debug!(target: "live.reconcile", line, fallback_line, "error");
        return Reconciliation {
            annotation: Annotation::error(line, format!("Error: {concise}"), &colors.error),
            alert: Some(err.to_string()),
        };
    }

    let text = if result.stdout.trim().is_empty() {
        NO_OUTPUT.to_string()
    } else {
        format!("Output: {}", last_line(&result.stdout))
    };
    debug!(target: "live.reconcile", line = fallback_line, "output");
    Reconciliation {
        annotation: Annotation::output(fallback_line, text, &colors.output),
        alert: None,
    }
}
