//! Diagnostics for configuration decoding and graph construction.
//!
//! Problems found in user configuration are never Rust errors: they are
//! structured diagnostics collected into a [`Diagnostics`] list so a single
//! pass can report as many problems as possible before the caller decides
//! whether to continue.
//!
//! # Design
//!
//! - `Diagnostic` - single record with summary, detail and optional subject span
//! - `DiagnosticKind` - categorizes the problem
//! - `Severity` - error or warning
//! - `Diagnostics` - ordered collection with error/warning queries
//!
//! # Examples
//!
//! ```
//! # use tessera_config::error::*;
//! # use tessera_config::foundation::Span;
//! let mut diags = Diagnostics::new();
//! diags.push(Diagnostic::warning(
//!     DiagnosticKind::DeprecatedVersionInBlock,
//!     "Version constraints inside provider configuration blocks are deprecated",
//!     "Move the constraint into the required_providers block.",
//! ).with_subject(Span::zero("main.tf")));
//! assert!(!diags.has_errors());
//! assert_eq!(diags.warnings().count(), 1);
//! ```

use std::fmt;

use crate::foundation::Span;

/// Configuration diagnostic.
///
/// Each diagnostic has:
/// - Kind (categorizes the problem)
/// - Severity (error or warning)
/// - Summary (short, one line)
/// - Detail (full explanation, possibly with a suggested fix)
/// - Optional subject (where the problem is)
/// - Optional secondary labels (related locations)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Category of this diagnostic
    pub kind: DiagnosticKind,
    /// Severity level
    pub severity: Severity,
    /// Short summary
    pub summary: String,
    /// Detailed explanation
    pub detail: String,
    /// Primary source location, when known
    pub subject: Option<Span>,
    /// Additional labeled spans
    pub labels: Vec<Label>,
}

/// Category of diagnostic.
///
/// # Invariant
///
/// The discriminant values must match the KIND_NAMES array indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DiagnosticKind {
    // Addresses
    /// Malformed compact provider address, including extraneous trailing segments
    InvalidAddress = 0,
    /// Provider local name is not normalized
    InvalidLocalName = 1,

    // Provider declaration decoding
    /// `alias` and `for_each` used together
    ConflictingMetaArguments = 2,
    /// `version` inside a provider block
    DeprecatedVersionInBlock = 3,
    /// Malformed version constraint string
    InvalidVersionConstraint = 4,
    /// Argument name reserved for future use
    ReservedArgument = 5,
    /// Block type reserved for future use
    ReservedBlockType = 6,
    /// More than one `_` escape block
    DuplicateEscapeBlock = 7,
    /// Argument not accepted by the body schema
    UnsupportedArgument = 8,
    /// Required argument absent from the body
    MissingArgument = 9,

    // Expansion
    /// Alias or for_each key is not a valid identifier
    InvalidAlias = 10,
    /// for_each used where no static evaluator exists
    IterationNotSupported = 11,
    /// for_each value is not a keyed collection
    InvalidForEach = 12,
    /// Expression could not be evaluated statically
    InvalidExpression = 13,

    // Graph construction
    /// Two provider instances with the same address in one module
    DuplicateProviderConfig = 14,
    /// Aliased provider requirement with no matching configuration
    ProviderNotPresent = 15,
    /// More than one equally eligible provider candidate
    ProviderResolutionAmbiguous = 16,
    /// Edge would close a dependency cycle
    CycleDetected = 17,
}

/// Human-readable names for diagnostic kinds.
///
/// Index matches DiagnosticKind discriminant.
const KIND_NAMES: &[&str] = &[
    "invalid address",               // 0: InvalidAddress
    "invalid local name",            // 1: InvalidLocalName
    "conflicting meta-arguments",    // 2: ConflictingMetaArguments
    "deprecated version in block",   // 3: DeprecatedVersionInBlock
    "invalid version constraint",    // 4: InvalidVersionConstraint
    "reserved argument",             // 5: ReservedArgument
    "reserved block type",           // 6: ReservedBlockType
    "duplicate escape block",        // 7: DuplicateEscapeBlock
    "unsupported argument",          // 8: UnsupportedArgument
    "missing argument",              // 9: MissingArgument
    "invalid alias",                 // 10: InvalidAlias
    "iteration not supported",       // 11: IterationNotSupported
    "invalid for_each",              // 12: InvalidForEach
    "invalid expression",            // 13: InvalidExpression
    "duplicate provider config",     // 14: DuplicateProviderConfig
    "provider not present",          // 15: ProviderNotPresent
    "ambiguous provider resolution", // 16: ProviderResolutionAmbiguous
    "cycle detected",                // 17: CycleDetected
];

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Warning (configuration is valid but should change)
    Warning,
    /// Error (the affected declaration or pass cannot proceed)
    Error,
}

/// Secondary labeled span in a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Source location
    pub span: Span,
    /// Label text
    pub message: String,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn error(
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::with_severity(kind, Severity::Error, summary.into(), detail.into())
    }

    /// Creates a new warning diagnostic.
    pub fn warning(
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::with_severity(kind, Severity::Warning, summary.into(), detail.into())
    }

    fn with_severity(
        kind: DiagnosticKind,
        severity: Severity,
        summary: String,
        detail: String,
    ) -> Self {
        Self {
            kind,
            severity,
            summary,
            detail,
            subject: None,
            labels: Vec::new(),
        }
    }

    /// Sets the primary source location.
    pub fn with_subject(mut self, span: Span) -> Self {
        self.subject = Some(span);
        self
    }

    /// Adds a secondary labeled span.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    /// True for error severity.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl DiagnosticKind {
    /// Returns a human-readable name for this kind.
    pub fn name(self) -> &'static str {
        KIND_NAMES[self as usize]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if let Some(subject) = &self.subject {
            write!(f, " ({subject})")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Ordered list of diagnostics.
///
/// Order is the order in which problems were found; it is deterministic
/// because every producer walks its input in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Create an empty list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a single diagnostic.
    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    /// Move every diagnostic of `other` into this list.
    pub fn append(&mut self, other: &mut Diagnostics) {
        self.0.append(&mut other.0);
    }

    /// True if any diagnostic has error severity.
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// Iterate error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    /// Iterate warning diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }

    /// True if any diagnostic is of the given kind.
    pub fn contains_kind(&self, kind: DiagnosticKind) -> bool {
        self.0.iter().any(|d| d.kind == kind)
    }

    /// Count diagnostics of the given kind.
    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.0.iter().filter(|d| d.kind == kind).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the list.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl Extend<Diagnostics> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostics>>(&mut self, iter: T) {
        for diags in iter {
            self.0.extend(diags.0);
        }
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diag}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_discriminants() {
        assert_eq!(DiagnosticKind::InvalidAddress.name(), "invalid address");
        assert_eq!(DiagnosticKind::CycleDetected.name(), "cycle detected");
        assert_eq!(KIND_NAMES.len(), DiagnosticKind::CycleDetected as usize + 1);
    }

    #[test]
    fn test_has_errors_ignores_warnings() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning(
            DiagnosticKind::DeprecatedVersionInBlock,
            "deprecated",
            "",
        ));
        assert!(!diags.has_errors());

        diags.push(Diagnostic::error(DiagnosticKind::InvalidAlias, "bad", ""));
        assert!(diags.has_errors());
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.count_kind(DiagnosticKind::InvalidAlias), 1);
    }

    #[test]
    fn test_display_includes_subject() {
        let diag = Diagnostic::error(DiagnosticKind::InvalidAlias, "Invalid alias", "nope")
            .with_subject(Span::zero("main.tf"));
        assert_eq!(diag.to_string(), "error: Invalid alias (main.tf:1,1-1): nope");
    }
}
