//! Expressions handed out by the body collaborator.
//!
//! The general expression language is owned by an external evaluator. This
//! crate only needs enough structure to find free variable references and to
//! evaluate the static subset used by `alias` and `for_each`: literals,
//! references, objects and tuples.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::eval::EvalContext;
use crate::foundation::Span;
use crate::traversal::{TraverseStep, Traversal};
use crate::value::Value;

/// An expression with its source range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Constant value
    Literal(Value),
    /// Reference to a variable, e.g. `var.regions`
    Reference(Traversal),
    /// `{ key = expr, ... }`
    Object(Vec<(String, Expr)>),
    /// `[expr, ...]`
    Tuple(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Literal expression with a synthetic span.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(ExprKind::Literal(value.into()), Span::synthetic())
    }

    /// Reference expression spanning its traversal.
    pub fn reference(traversal: Traversal) -> Self {
        let span = traversal.span();
        Self::new(ExprKind::Reference(traversal), span)
    }

    /// Object expression with a synthetic span.
    pub fn object<K: Into<String>>(items: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Self::new(
            ExprKind::Object(items.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            Span::synthetic(),
        )
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Free variable references, in source order.
    pub fn references(&self) -> Vec<&Traversal> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Traversal>) {
        match &self.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Reference(t) => out.push(t),
            ExprKind::Object(items) => {
                for (_, item) in items {
                    item.collect_references(out);
                }
            }
            ExprKind::Tuple(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
        }
    }

    /// Evaluate against a context.
    ///
    /// An empty context is the context-free decode: any reference fails.
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosticKind::InvalidExpression`] for unknown variables,
    /// missing attributes and bad index steps.
    pub fn value(&self, ctx: &EvalContext) -> Result<Value, Diagnostics> {
        match &self.kind {
            ExprKind::Literal(v) => Ok(v.clone()),
            ExprKind::Reference(t) => self.resolve_reference(t, ctx),
            ExprKind::Object(items) => {
                let mut diags = Diagnostics::new();
                let mut map = IndexMap::new();
                for (key, item) in items {
                    match item.value(ctx) {
                        Ok(v) => {
                            map.insert(key.clone(), v);
                        }
                        Err(mut e) => diags.append(&mut e),
                    }
                }
                if diags.has_errors() {
                    Err(diags)
                } else {
                    Ok(Value::Map(map))
                }
            }
            ExprKind::Tuple(items) => {
                let mut diags = Diagnostics::new();
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item.value(ctx) {
                        Ok(v) => out.push(v),
                        Err(mut e) => diags.append(&mut e),
                    }
                }
                if diags.has_errors() {
                    Err(diags)
                } else {
                    Ok(Value::List(out))
                }
            }
        }
    }

    fn resolve_reference(&self, t: &Traversal, ctx: &EvalContext) -> Result<Value, Diagnostics> {
        let invalid = |span: &Span, summary: &str, detail: String| {
            Diagnostics::from(
                Diagnostic::error(DiagnosticKind::InvalidExpression, summary, detail)
                    .with_subject(span.clone()),
            )
        };

        let root = t.root_name();
        let Some(mut current) = ctx.variable(root) else {
            let detail = if ctx.is_empty() {
                format!("Variables may not be used here; found a reference to {t}.")
            } else {
                format!("There is no variable named {root:?} in this context.")
            };
            return Err(invalid(&self.span, "Unknown variable", detail));
        };

        for step in &t.steps()[1..] {
            current = match step {
                TraverseStep::Attr { name, span } => match current {
                    Value::Map(m) => m.get(name).ok_or_else(|| {
                        invalid(
                            span,
                            "Unsupported attribute",
                            format!("This object does not have an attribute named {name:?}."),
                        )
                    })?,
                    other => {
                        return Err(invalid(
                            span,
                            "Unsupported attribute",
                            format!(
                                "Can't access attributes on a value of type {}.",
                                other.type_name()
                            ),
                        ));
                    }
                },
                TraverseStep::Index { key, span } => match (current, key) {
                    (Value::Map(m), Value::String(k)) => m.get(k).ok_or_else(|| {
                        invalid(
                            span,
                            "Invalid index",
                            format!("The given key {k:?} does not identify an element in this collection."),
                        )
                    })?,
                    (Value::List(items), Value::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => {
                        items.get(*n as usize).ok_or_else(|| {
                            invalid(
                                span,
                                "Invalid index",
                                "The given index is out of range.".to_string(),
                            )
                        })?
                    }
                    (other, _) => {
                        return Err(invalid(
                            span,
                            "Invalid index",
                            format!(
                                "This value of type {} cannot be indexed by {key}.",
                                other.type_name()
                            ),
                        ));
                    }
                },
                TraverseStep::Root { .. } => unreachable!("root step only appears first"),
            };
        }

        Ok(current.clone())
    }
}
