//! Provider declaration expansion.
//!
//! A [`ProviderBlock`] expands into one or more [`Provider`] instances:
//! exactly one for a plain or aliased declaration, one per key for a
//! `for_each` declaration. The `for_each` key becomes the instance alias and
//! the entry value is kept so the instance configuration can read it as
//! `each.value`.

use std::sync::Arc;

use tracing::trace;

use crate::addrs::{ModulePath, ProviderAddress};
use crate::body::Body;
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::eval::{StaticEvaluator, StaticIdentifier, decode_string_context_free, evaluate_for_each};
use crate::foundation::{BAD_IDENTIFIER_DETAIL, Span, is_valid_identifier};
use crate::provider::ProviderBlock;
use crate::value::Value;
use crate::version::VersionConstraint;

/// One instance of a provider declaration.
#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    /// Empty for the default configuration
    pub alias: String,
    pub config: Arc<dyn Body>,
    /// `each.value` for a for_each instance
    pub instance_value: Option<Value>,
    pub version: Option<VersionConstraint>,
    pub decl_range: Span,
}

impl Provider {
    /// Compact address of this instance.
    pub fn addr(&self) -> ProviderAddress {
        ProviderAddress::aliased(self.name.clone(), self.alias.clone())
    }

    /// `each.key` for a for_each instance.
    pub fn instance_key(&self) -> Option<&str> {
        self.instance_value.as_ref().map(|_| self.alias.as_str())
    }
}

/// Expand a decoded declaration into its instances.
///
/// `evaluator` is None where no static evaluation is possible; aliases then
/// go through a context-free decode and `for_each` is rejected.
pub fn expand_provider_block(
    block: &ProviderBlock,
    module: &ModulePath,
    evaluator: Option<&dyn StaticEvaluator>,
) -> (Vec<Provider>, Diagnostics) {
    let instance = |alias: String, instance_value: Option<Value>| Provider {
        name: block.name.clone(),
        alias,
        config: block.config.clone(),
        instance_value,
        version: block.version.clone(),
        decl_range: block.decl_range.clone(),
    };

    let Some(for_each) = &block.for_each else {
        let Some(alias_expr) = &block.alias_expr else {
            return (vec![instance(String::new(), None)], Diagnostics::new());
        };

        let ident = StaticIdentifier {
            module: module.clone(),
            subject: format!("provider.{}.alias", block.name),
            decl_range: alias_expr.span.clone(),
        };
        let decoded = match evaluator {
            Some(evaluator) => evaluator.decode_string(alias_expr, &ident),
            None => decode_string_context_free(alias_expr, &ident.subject),
        };
        let alias = match decoded {
            Ok(alias) => alias,
            Err(diags) => return (Vec::new(), diags),
        };
        if !is_valid_identifier(&alias) {
            return (
                Vec::new(),
                Diagnostic::error(
                    DiagnosticKind::InvalidAlias,
                    "Invalid provider configuration alias",
                    format!("An alias must be a valid name. {BAD_IDENTIFIER_DETAIL}"),
                )
                .with_subject(alias_expr.span.clone())
                .into(),
            );
        }
        return (vec![instance(alias, None)], Diagnostics::new());
    };

    let Some(evaluator) = evaluator else {
        return (
            Vec::new(),
            Diagnostic::error(
                DiagnosticKind::IterationNotSupported,
                "Iteration not allowed here",
                "The \"for_each\" argument cannot be used in provider blocks that are evaluated without a static context.",
            )
            .with_subject(for_each.span.clone())
            .into(),
        );
    };

    let ident = StaticIdentifier {
        module: module.clone(),
        subject: format!("provider.{}.for_each", block.name),
        decl_range: for_each.span.clone(),
    };
    let entries = match evaluate_for_each(for_each, |refs| evaluator.eval_context(&ident, refs)) {
        Ok(entries) => entries,
        Err(diags) => return (Vec::new(), diags),
    };

    let mut diags = Diagnostics::new();
    for (key, _) in &entries {
        if !is_valid_identifier(key) {
            diags.push(
                Diagnostic::error(
                    DiagnosticKind::InvalidAlias,
                    "Invalid for_each key alias",
                    format!("Alias {key:?} must be a valid name. {BAD_IDENTIFIER_DETAIL}"),
                )
                .with_subject(for_each.span.clone()),
            );
        }
    }
    if diags.has_errors() {
        return (Vec::new(), diags);
    }

    trace!(provider = %block.name, %module, instances = entries.len(), "expanded for_each");
    let providers = entries
        .into_iter()
        .map(|(key, value)| instance(key, Some(value)))
        .collect();
    (providers, diags)
}
