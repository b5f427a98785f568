//! Provider version constraints.
//!
//! Constraint strings are comma-separated clauses such as `>= 1.2, < 2.0` or
//! `~> 4.0`. Versions are dotted numeric segments with an optional
//! prerelease suffix.

use std::fmt;

use crate::body::Attribute;
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::eval::decode_string_context_free;
use crate::foundation::Span;

/// Comparison operator of one clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    /// `~>`: any version with the same leading segments
    Pessimistic,
}

impl ConstraintOp {
    fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Eq => "=",
            ConstraintOp::NotEq => "!=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Lt => "<",
            ConstraintOp::Le => "<=",
            ConstraintOp::Pessimistic => "~>",
        }
    }
}

/// One `op version` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionClause {
    pub op: ConstraintOp,
    pub segments: Vec<u64>,
    pub prerelease: Option<String>,
}

impl fmt::Display for VersionClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self
            .segments
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{} {}", self.op.symbol(), version)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

/// Decoded version constraint with its source range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionConstraint {
    pub clauses: Vec<VersionClause>,
    pub span: Span,
}

impl VersionConstraint {
    /// Parse a constraint string.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed clause.
    pub fn parse(s: &str) -> Result<Vec<VersionClause>, String> {
        let mut clauses = Vec::new();
        for raw in s.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err("empty version constraint clause".to_string());
            }
            let (op, rest) = [
                ("~>", ConstraintOp::Pessimistic),
                (">=", ConstraintOp::Ge),
                ("<=", ConstraintOp::Le),
                ("!=", ConstraintOp::NotEq),
                (">", ConstraintOp::Gt),
                ("<", ConstraintOp::Lt),
                ("=", ConstraintOp::Eq),
            ]
            .iter()
            .find_map(|(sym, op)| raw.strip_prefix(sym).map(|rest| (*op, rest)))
            .unwrap_or((ConstraintOp::Eq, raw));

            let rest = rest.trim();
            let (version, prerelease) = match rest.split_once('-') {
                Some((v, pre)) if !pre.is_empty() => (v, Some(pre.to_string())),
                Some(_) => return Err(format!("invalid prerelease in {raw:?}")),
                None => (rest, None),
            };
            let segments = version
                .split('.')
                .map(|seg| seg.parse::<u64>().map_err(|_| format!("invalid version {rest:?}")))
                .collect::<Result<Vec<_>, _>>()?;
            if segments.len() > 3 {
                return Err(format!("version {rest:?} has more than three segments"));
            }
            clauses.push(VersionClause {
                op,
                segments,
                prerelease,
            });
        }
        Ok(clauses)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses = self
            .clauses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        write!(f, "{}", clauses.join(", "))
    }
}

/// Decode a `version` attribute.
pub fn decode_version_constraint(attr: &Attribute) -> (VersionConstraint, Diagnostics) {
    let mut constraint = VersionConstraint {
        clauses: Vec::new(),
        span: attr.expr.span.clone(),
    };
    let raw = match decode_string_context_free(&attr.expr, "the version argument") {
        Ok(raw) => raw,
        Err(diags) => return (constraint, diags),
    };
    match VersionConstraint::parse(&raw) {
        Ok(clauses) => {
            constraint.clauses = clauses;
            (constraint, Diagnostics::new())
        }
        Err(reason) => (
            constraint,
            Diagnostic::error(
                DiagnosticKind::InvalidVersionConstraint,
                "Invalid version constraint",
                format!("This string does not use correct version constraint syntax: {reason}."),
            )
            .with_subject(attr.expr.span.clone())
            .into(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    #[test]
    fn test_parse_clauses() {
        let clauses = VersionConstraint::parse(">= 1.2.0, < 2.0").unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].op, ConstraintOp::Ge);
        assert_eq!(clauses[1].segments, vec![2, 0]);

        let clauses = VersionConstraint::parse("~> 4.0").unwrap();
        assert_eq!(clauses[0].op, ConstraintOp::Pessimistic);

        let clauses = VersionConstraint::parse("1.0.0-beta1").unwrap();
        assert_eq!(clauses[0].op, ConstraintOp::Eq);
        assert_eq!(clauses[0].prerelease.as_deref(), Some("beta1"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(VersionConstraint::parse("").is_err());
        assert!(VersionConstraint::parse(">= one").is_err());
        assert!(VersionConstraint::parse("1.2.3.4").is_err());
        assert!(VersionConstraint::parse(">= 1.0,").is_err());
    }

    #[test]
    fn test_decode_attribute() {
        let (constraint, diags) =
            decode_version_constraint(&Attribute::new("version", Expr::literal("~> 1.0")));
        assert!(diags.is_empty());
        assert_eq!(constraint.to_string(), "~> 1.0");

        let (_, diags) =
            decode_version_constraint(&Attribute::new("version", Expr::literal("latest")));
        assert!(diags.contains_kind(DiagnosticKind::InvalidVersionConstraint));
    }
}
