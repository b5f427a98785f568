//! Static evaluation collaborator.
//!
//! Provider declarations are expanded before any resource exists, so `alias`
//! and `for_each` can only see values known at load time (variables, locals).
//! The caller supplies a [`StaticEvaluator`] that turns a set of free
//! references into an [`EvalContext`]; some contexts (isolated test fixtures)
//! have none, in which case only context-free decoding is possible.

use indexmap::IndexMap;

use crate::addrs::ModulePath;
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::expr::Expr;
use crate::foundation::Span;
use crate::traversal::Traversal;
use crate::value::Value;

/// Variables visible to an expression, keyed by root name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    variables: IndexMap<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Identifies what is being statically evaluated, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentifier {
    /// Module containing the expression
    pub module: ModulePath,
    /// Dotted subject, e.g. `provider.aws.alias`
    pub subject: String,
    /// Range of the expression being evaluated
    pub decl_range: Span,
}

/// Evaluates expressions given their free variable references.
pub trait StaticEvaluator {
    /// Build a context containing every value the references need.
    fn eval_context(
        &self,
        ident: &StaticIdentifier,
        refs: &[&Traversal],
    ) -> (EvalContext, Diagnostics);

    /// Evaluate `expr` to a string.
    ///
    /// # Errors
    ///
    /// Propagates context diagnostics, and fails with
    /// [`DiagnosticKind::InvalidExpression`] when the result is not a string.
    fn decode_string(&self, expr: &Expr, ident: &StaticIdentifier) -> Result<String, Diagnostics> {
        let (ctx, diags) = self.eval_context(ident, &expr.references());
        if diags.has_errors() {
            return Err(diags);
        }
        let value = expr.value(&ctx)?;
        expect_string(value, &expr.span, &ident.subject)
    }
}

/// Decode a string without any evaluation context.
///
/// # Errors
///
/// Fails for any variable reference or a non-string result.
pub fn decode_string_context_free(expr: &Expr, subject: &str) -> Result<String, Diagnostics> {
    let value = expr.value(&EvalContext::new())?;
    expect_string(value, &expr.span, subject)
}

fn expect_string(value: Value, span: &Span, subject: &str) -> Result<String, Diagnostics> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(Diagnostic::error(
            DiagnosticKind::InvalidExpression,
            "Incorrect value type",
            format!(
                "Invalid expression value for {subject}: a string is required, but got {}.",
                other.type_name()
            ),
        )
        .with_subject(span.clone())
        .into()),
    }
}

/// In-memory evaluator backed by known root values.
///
/// Roots such as `var` and `local` map to objects of their members. Any
/// reference to a root that is not present is rejected as non-static.
#[derive(Debug, Clone, Default)]
pub struct StaticValues {
    roots: IndexMap<String, Value>,
}

impl StaticValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root value.
    pub fn with_root(mut self, name: impl Into<String>, value: Value) -> Self {
        self.roots.insert(name.into(), value);
        self
    }
}

impl StaticEvaluator for StaticValues {
    fn eval_context(
        &self,
        ident: &StaticIdentifier,
        refs: &[&Traversal],
    ) -> (EvalContext, Diagnostics) {
        let mut ctx = EvalContext::new();
        let mut diags = Diagnostics::new();
        for traversal in refs {
            let root = traversal.root_name();
            match self.roots.get(root) {
                Some(value) => ctx.set_variable(root, value.clone()),
                None => diags.push(
                    Diagnostic::error(
                        DiagnosticKind::InvalidExpression,
                        "Dynamic value in static context",
                        format!(
                            "Unable to use {traversal} in {}: only values known during configuration loading may be referenced.",
                            ident.subject
                        ),
                    )
                    .with_subject(traversal.span()),
                ),
            }
        }
        (ctx, diags)
    }
}

/// Evaluate a `for_each` expression into key/value pairs.
///
/// Maps yield their entries; sets of strings yield each string as both key
/// and value. Entries are sorted by key.
///
/// # Errors
///
/// Fails with [`DiagnosticKind::InvalidForEach`] for null values, lists,
/// sets containing non-strings and scalars; context diagnostics pass through.
pub fn evaluate_for_each<F>(expr: &Expr, context: F) -> Result<Vec<(String, Value)>, Diagnostics>
where
    F: FnOnce(&[&Traversal]) -> (EvalContext, Diagnostics),
{
    let (ctx, diags) = context(&expr.references());
    if diags.has_errors() {
        return Err(diags);
    }
    let invalid = |detail: String| {
        Diagnostics::from(
            Diagnostic::error(DiagnosticKind::InvalidForEach, "Invalid for_each argument", detail)
                .with_subject(expr.span.clone()),
        )
    };

    let mut entries = match expr.value(&ctx)? {
        Value::Map(m) => m.into_iter().collect::<Vec<_>>(),
        Value::Set(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push((s.clone(), Value::String(s))),
                    other => {
                        return Err(invalid(format!(
                            "The given \"for_each\" argument value is a set containing {}; sets used in for_each must contain only strings.",
                            other.type_name()
                        )));
                    }
                }
            }
            out
        }
        Value::Null => {
            return Err(invalid(
                "The given \"for_each\" argument value is null. A map, or set of strings is allowed.".to_string(),
            ));
        }
        other => {
            return Err(invalid(format!(
                "The given \"for_each\" argument value is unsuitable: the \"for_each\" argument must be a map, or set of strings, and you have provided a value of type {}.",
                other.type_name()
            )));
        }
    };
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.dedup_by(|a, b| a.0 == b.0);
    Ok(entries)
}
