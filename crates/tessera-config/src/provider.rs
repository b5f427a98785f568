//! Provider declaration decoding.
//!
//! Turns a raw `provider "name" { ... }` block into a [`ProviderBlock`]:
//! meta-arguments are peeled off with a fixed schema and everything else
//! stays in the configuration body that is eventually sent to the provider.
//!
//! # Schema
//!
//! | Item | Meaning |
//! |---|---|
//! | `alias` | static alias name |
//! | `for_each` | keyed expansion, mutually exclusive with `alias` |
//! | `version` | deprecated version constraint |
//! | `count`, `depends_on`, `source` | reserved |
//! | `_ { }` | escape block, merged into the configuration body |
//! | `lifecycle`, `locals` | reserved |

use std::sync::Arc;

use tracing::trace;

use crate::addrs::check_provider_name_normalized;
use crate::body::{
    AttributeSchema, Block, BlockHeaderSchema, Body, BodyContent, BodySchema, merge_bodies,
};
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::expr::Expr;
use crate::foundation::Span;
use crate::version::{VersionConstraint, decode_version_constraint};

/// Block type of the meta-argument escape block.
pub const ESCAPE_BLOCK_TYPE: &str = "_";

const RESERVED_ARGUMENTS: &[&str] = &["depends_on", "source", "count"];

const PROVIDER_BLOCK_SCHEMA: BodySchema = BodySchema {
    attributes: &[
        AttributeSchema { name: "alias", required: false },
        AttributeSchema { name: "version", required: false },
        AttributeSchema { name: "for_each", required: false },
        // Reserved for future expansion.
        AttributeSchema { name: "count", required: false },
        AttributeSchema { name: "depends_on", required: false },
        AttributeSchema { name: "source", required: false },
    ],
    blocks: &[
        BlockHeaderSchema { type_name: ESCAPE_BLOCK_TYPE },
        // Reserved for future expansion.
        BlockHeaderSchema { type_name: "lifecycle" },
        BlockHeaderSchema { type_name: "locals" },
    ],
};

/// A decoded provider declaration, before expansion.
#[derive(Debug, Clone)]
pub struct ProviderBlock {
    /// Provider local name (normalized)
    pub name: String,
    pub name_range: Span,
    /// `alias` expression, None if not set
    pub alias_expr: Option<Expr>,
    /// `for_each` expression, None if not set
    pub for_each: Option<Expr>,
    /// Deprecated in-block version constraint
    pub version: Option<VersionConstraint>,
    /// Everything the provider itself should decode
    pub config: Arc<dyn Body>,
    pub decl_range: Span,
}

/// Decode a `provider` block.
///
/// Returns None when the block cannot describe a provider at all (missing or
/// unnormalized name); otherwise the declaration is returned together with
/// any diagnostics, which may still contain errors.
pub fn decode_provider_block(block: &Block) -> (Option<ProviderBlock>, Diagnostics) {
    let mut diags = Diagnostics::new();

    let (content, config, mut content_diags) = block.body.partial_content(&PROVIDER_BLOCK_SCHEMA);
    diags.append(&mut content_diags);

    let Some(name) = block.labels.first() else {
        diags.push(
            Diagnostic::error(
                DiagnosticKind::MissingArgument,
                "Missing name for provider",
                "All provider blocks must have a label giving the provider local name.",
            )
            .with_subject(block.def_range.clone()),
        );
        return (None, diags);
    };

    // An unnormalized name must not reach consumers that treat it as a
    // provider type.
    let mut name_diags = check_provider_name_normalized(name, &block.def_range);
    let name_invalid = name_diags.has_errors();
    diags.append(&mut name_diags);
    if name_invalid {
        return (None, diags);
    }

    let mut provider = ProviderBlock {
        name: name.clone(),
        name_range: block
            .label_ranges
            .first()
            .unwrap_or(&block.def_range)
            .clone(),
        alias_expr: content.attributes.get("alias").map(|a| a.expr.clone()),
        for_each: content.attributes.get("for_each").map(|a| a.expr.clone()),
        version: None,
        config,
        decl_range: block.def_range.clone(),
    };

    if let (Some(alias), Some(_)) = (&provider.alias_expr, &provider.for_each) {
        diags.push(
            Diagnostic::error(
                DiagnosticKind::ConflictingMetaArguments,
                r#"Invalid combination of "alias" and "for_each""#,
                r#"The "alias" and "for_each" arguments are mutually-exclusive, only one may be used."#,
            )
            .with_subject(alias.span.clone()),
        );
    }

    if let Some(attr) = content.attributes.get("version") {
        diags.push(
            Diagnostic::warning(
                DiagnosticKind::DeprecatedVersionInBlock,
                "Version constraints inside provider configuration blocks are deprecated",
                "Earlier versions allowed provider version constraints inside the provider configuration block, but that is now deprecated and will be removed in a future version. To silence this warning, move the provider version constraint into the required_providers block.",
            )
            .with_subject(attr.expr.span.clone()),
        );
        let (version, mut version_diags) = decode_version_constraint(attr);
        provider.version = Some(version);
        diags.append(&mut version_diags);
    }

    diags.append(&mut check_reserved_names(&content));

    let mut seen_escape: Option<&Block> = None;
    for nested in &content.blocks {
        if nested.type_name == ESCAPE_BLOCK_TYPE {
            if let Some(first) = seen_escape {
                diags.push(
                    Diagnostic::error(
                        DiagnosticKind::DuplicateEscapeBlock,
                        "Duplicate escaping block",
                        format!(
                            "The special block type \"_\" can be used to force particular arguments to be interpreted as provider-specific rather than as meta-arguments, but each provider block can have only one such block. The first escaping block was at {}.",
                            first.def_range
                        ),
                    )
                    .with_subject(nested.def_range.clone())
                    .with_label(first.def_range.clone(), "first escaping block"),
                );
                continue;
            }
            seen_escape = Some(nested);
            provider.config = merge_bodies(vec![provider.config.clone(), nested.body.clone()]);
        } else {
            diags.push(
                Diagnostic::error(
                    DiagnosticKind::ReservedBlockType,
                    "Reserved block type name in provider block",
                    format!(
                        "The block type name {:?} is reserved for use in a future version.",
                        nested.type_name
                    ),
                )
                .with_subject(nested.type_range.clone()),
            );
        }
    }

    trace!(provider = %provider.name, "decoded provider block");
    (Some(provider), diags)
}

fn check_reserved_names(content: &BodyContent) -> Diagnostics {
    let mut diags = Diagnostics::new();
    for name in RESERVED_ARGUMENTS {
        if let Some(attr) = content.attributes.get(*name) {
            diags.push(
                Diagnostic::error(
                    DiagnosticKind::ReservedArgument,
                    "Reserved argument name in provider block",
                    format!("The provider argument name {name:?} is reserved for use in a future version."),
                )
                .with_subject(attr.name_range.clone()),
            );
        }
    }
    diags
}
