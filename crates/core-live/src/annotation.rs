//! Annotation and decoration value types.
//!
//! An `Annotation` is the single display decision produced per run. The
//! presenter turns it into one or more `Decoration`s (inline text, line
//! highlight) which the host surface actually draws.

/// Which slot an annotation occupies. At most one active annotation per
/// slot and editor; `None` is a clear directive and never occupies a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Output,
    Error,
    None,
}

impl AnnotationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationKind::Output => "output",
            AnnotationKind::Error => "error",
            AnnotationKind::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// 0-based editor line.
    pub line: usize,
    pub text: String,
    pub color: String,
}

impl Annotation {
    pub fn output(line: usize, text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Output,
            line,
            text: text.into(),
            color: color.into(),
        }
    }

    pub fn error(line: usize, text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Error,
            line,
            text: text.into(),
            color: color.into(),
        }
    }

    /// Clear directive emitted when the cursor line is not evaluated.
    pub fn none(line: usize) -> Self {
        Self {
            kind: AnnotationKind::None,
            line,
            text: String::new(),
            color: String::new(),
        }
    }
}

/// Handle returned by the surface for every applied decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecorationId(pub u64);

/// Primitive visual layer understood by an `AnnotationSurface`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoration {
    /// Text rendered after the end of `line`; `column` is the line length in chars.
    Inline {
        line: usize,
        column: usize,
        text: String,
        color: String,
    },
    /// Background highlight over `[start, end)` chars of `line`.
    Highlight {
        line: usize,
        start: usize,
        end: usize,
        color: String,
    },
}

impl Decoration {
    pub fn line(&self) -> usize {
        match self {
            Decoration::Inline { line, .. } | Decoration::Highlight { line, .. } => *line,
        }
    }
}
