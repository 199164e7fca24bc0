//! Diagnostic collection.
//!
//! Every check writes into a [`Report`]: an ordered list of
//! [`Diagnostic`]s, each with a category, a severity, a primary message
//! anchored to a source span, and optional related messages pointing at
//! other locations. Insertion order is preserved and nothing is
//! deduplicated, so for a fixed program the diagnostic sequence is
//! bit-identical across runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use stratal_ast::Span;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Category of a diagnostic, named after the rule family that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Undefined relation, type, or functor.
    Reference,
    /// Atom, functor, or record arity mismatch.
    Arity,
    /// Duplicate type/relation/attribute/field names.
    Namespace,
    /// Malformed clause shape (underscores, facts, plans).
    Shape,
    /// Ungrounded variable or record.
    Grounding,
    /// Aggregator witness escaping its scope.
    Witness,
    /// Type inference and subtype violations.
    Typing,
    /// Inlining feasibility rules.
    Inlining,
    /// Cyclic negation or aggregation.
    Stratification,
    /// Execution plan version bounds.
    Plan,
    /// Numeric range and I/O-type restrictions.
    Domain,
    /// Stylistic lints (use-once variables, empty relations).
    Style,
}

impl DiagnosticKind {
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::Reference => "undefined reference",
            DiagnosticKind::Arity => "arity mismatch",
            DiagnosticKind::Namespace => "name clash",
            DiagnosticKind::Shape => "malformed clause",
            DiagnosticKind::Grounding => "ungrounded term",
            DiagnosticKind::Witness => "witness scope",
            DiagnosticKind::Typing => "type error",
            DiagnosticKind::Inlining => "inlining restriction",
            DiagnosticKind::Stratification => "stratification",
            DiagnosticKind::Plan => "execution plan",
            DiagnosticKind::Domain => "domain restriction",
            DiagnosticKind::Style => "style",
        }
    }
}

/// A message with an optional source anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    pub message: String,
    pub span: Option<Span>,
}

impl DiagnosticMessage {
    pub fn at(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn unanchored(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }
}

/// One diagnostic: primary message plus related locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub primary: DiagnosticMessage,
    pub related: Vec<DiagnosticMessage>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            primary: DiagnosticMessage::at(message, span),
            related: Vec::new(),
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            primary: DiagnosticMessage::at(message, span),
            related: Vec::new(),
        }
    }

    /// A program-level error with no anchoring node.
    pub fn program_error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            primary: DiagnosticMessage::unanchored(message),
            related: Vec::new(),
        }
    }

    /// Attach a related location.
    pub fn with_related(mut self, message: impl Into<String>, span: Span) -> Self {
        self.related.push(DiagnosticMessage::at(message, span));
        self
    }

    /// Attach a related message with no location of its own.
    pub fn with_note(mut self, message: impl Into<String>) -> Self {
        self.related.push(DiagnosticMessage::unanchored(message));
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.severity,
            self.kind.name(),
            self.primary.message
        )
    }
}

impl std::error::Error for Diagnostic {}

/// Ordered diagnostic sink shared by all checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn add_error(&mut self, kind: DiagnosticKind, message: impl Into<String>, span: Span) {
        self.add(Diagnostic::error(kind, message, span));
    }

    pub fn add_warning(&mut self, kind: DiagnosticKind, message: impl Into<String>, span: Span) {
        self.add(Diagnostic::warning(kind, message, span));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
