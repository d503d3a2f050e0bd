// diag.rs — Error taxonomy and unified diagnostics model
//
// `HlsError` is what every generation phase returns; it is fail-fast, so the
// first error aborts the run. `Diagnostic` is the display form shared with the
// textual-IR parser, carrying a stable code and an optional source span.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use chumsky::span::SimpleSpan;
use thiserror::Error;

/// Byte-offset span in textual IR (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    // E00xx: input
    pub const E0001: DiagCode = DiagCode("E0001"); // parse error
    pub const E0002: DiagCode = DiagCode("E0002"); // configuration error

    // E01xx: structural violations
    pub const E0101: DiagCode = DiagCode("E0101"); // malformed construct
    pub const E0102: DiagCode = DiagCode("E0102"); // unsupported statement shape

    // E02xx: type / bit-width
    pub const E0201: DiagCode = DiagCode("E0201"); // word width mismatch
    pub const E0202: DiagCode = DiagCode("E0202"); // index out of bounds
    pub const E0203: DiagCode = DiagCode("E0203"); // extent mismatch
    pub const E0204: DiagCode = DiagCode("E0204"); // invalid extents

    // E03xx: scope / closure consistency
    pub const E0301: DiagCode = DiagCode("E0301"); // stencil update captured
    pub const E0302: DiagCode = DiagCode("E0302"); // stream not in scope
    pub const E0303: DiagCode = DiagCode("E0303"); // ambiguous classification
    pub const E0304: DiagCode = DiagCode("E0304"); // kernel argument name collision
}

// ── Error taxonomy ───────────────────────────────────────────────────────

/// Every way code generation (or a stencil value operation) can fail.
///
/// None of these are recoverable: the input IR or the generator must be fixed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HlsError {
    #[error("malformed `{construct}`: {message}")]
    Structural { construct: String, message: String },

    #[error("unsupported `{construct}`: {message}")]
    Unsupported { construct: String, message: String },

    #[error("word width mismatch: element type has {expected} bits, declared word has {found}")]
    BitWidthMismatch { expected: u32, found: u32 },

    #[error("index {index:?} out of bounds for stencil extents {extents:?}")]
    IndexOutOfBounds {
        index: [usize; 4],
        extents: [usize; 4],
    },

    #[error("extent mismatch in dimension {dim}: stencil has {stencil}, buffer has {buffer}")]
    ExtentMismatch {
        dim: usize,
        stencil: usize,
        buffer: i64,
    },

    #[error("invalid stencil extents {extents:?}: {message}")]
    InvalidExtents {
        extents: Vec<usize>,
        message: String,
    },

    #[error("stencil update `{name}` referenced inside hardware region `{region}`")]
    UpdateInClosure { name: String, region: String },

    #[error("stream `{name}` used in hardware region `{region}` has no stencil type in scope")]
    UnscopedStream { name: String, region: String },

    #[error("cannot classify `{name}` in hardware region `{region}`: matches both stream and scalar conventions")]
    AmbiguousName { name: String, region: String },

    #[error("`{first}` and `{second}` both print as kernel argument `{printed}` in hardware region `{region}`")]
    ArgumentCollision {
        first: String,
        second: String,
        printed: String,
        region: String,
    },
}

impl HlsError {
    pub fn structural(construct: impl Into<String>, message: impl Into<String>) -> Self {
        HlsError::Structural {
            construct: construct.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> DiagCode {
        match self {
            HlsError::Structural { .. } => codes::E0101,
            HlsError::Unsupported { .. } => codes::E0102,
            HlsError::BitWidthMismatch { .. } => codes::E0201,
            HlsError::IndexOutOfBounds { .. } => codes::E0202,
            HlsError::ExtentMismatch { .. } => codes::E0203,
            HlsError::InvalidExtents { .. } => codes::E0204,
            HlsError::UpdateInClosure { .. } => codes::E0301,
            HlsError::UnscopedStream { .. } => codes::E0302,
            HlsError::AmbiguousName { .. } => codes::E0303,
            HlsError::ArgumentCollision { .. } => codes::E0304,
        }
    }

    /// Render as a coded diagnostic; scope errors point at the front end.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let d = Diagnostic::new(DiagLevel::Error, None, self.to_string()).with_code(self.code());
        match self {
            HlsError::UpdateInClosure { .. }
            | HlsError::UnscopedStream { .. }
            | HlsError::AmbiguousName { .. }
            | HlsError::ArgumentCollision { .. } => {
                d.with_hint("front-end contract violation: check the lowered IR for this region")
            }
            HlsError::Unsupported { .. } => {
                d.with_hint("split the statement sequence so each drain is paired with one consumer")
            }
            _ => d,
        }
    }
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic ready for display.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub span: Option<Span>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code or hint.
    pub fn new(level: DiagLevel, span: Option<Span>, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            span,
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<&HlsError> for Diagnostic {
    fn from(e: &HlsError) -> Self {
        e.to_diagnostic()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(span) = &self.span {
            write!(f, " (at {}..{})", span.start, span.end)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_code() {
        let d = Diagnostic::new(DiagLevel::Error, None, "something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code_and_span() {
        use chumsky::span::Span as _;
        let d = Diagnostic::new(DiagLevel::Warning, Some(Span::new((), 3..7)), "odd token")
            .with_code(DiagCode("W0001"));
        assert_eq!(format!("{d}"), "warning[W0001]: odd token (at 3..7)");
    }

    #[test]
    fn scope_errors_carry_front_end_hint() {
        let e = HlsError::UnscopedStream {
            name: "in.stream".into(),
            region: "hw_output".into(),
        };
        let d = e.to_diagnostic();
        assert_eq!(d.code, Some(codes::E0302));
        assert!(d.message.contains("in.stream"));
        assert!(d.message.contains("hw_output"));
        assert!(d.hint.unwrap().contains("front-end"));
    }

    #[test]
    fn structural_error_message() {
        let e = HlsError::structural("stream_subimage", "expected 6 to 12 arguments, found 3");
        assert_eq!(
            e.to_string(),
            "malformed `stream_subimage`: expected 6 to 12 arguments, found 3"
        );
        assert_eq!(e.code(), codes::E0101);
    }
}
