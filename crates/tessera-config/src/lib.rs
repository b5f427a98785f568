//! Configuration model for provider resolution.
//!
//! This crate holds everything the graph builder reads: addresses, the body
//! and evaluation collaborators, provider declaration decoding and
//! expansion, and the module tree.
//!
//! # Modules
//!
//! - `foundation` - spans and identifier rules
//! - `error` - structured diagnostics
//! - `addrs` - provider, module and resource addresses
//! - `traversal` / `value` / `expr` - references, values and static expressions
//! - `body` - schema-driven configuration bodies
//! - `eval` - static evaluation and for_each
//! - `version` - version constraints
//! - `provider` - provider declaration decoding
//! - `expand` - provider instance expansion
//! - `module` - the module tree
//! - `fixture` - JSON module-tree fixtures

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod addrs;
pub mod body;
pub mod error;
pub mod eval;
pub mod expand;
pub mod expr;
pub mod fixture;
pub mod foundation;
pub mod module;
pub mod provider;
pub mod traversal;
pub mod value;
pub mod version;

pub use addrs::{AbsProviderAddress, ModulePath, ProviderAddress, ResourceAddress, ResourceMode};
pub use error::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use eval::{StaticEvaluator, StaticValues};
pub use expand::{Provider, expand_provider_block};
pub use foundation::Span;
pub use module::{Config, Module, ModuleCall, ModuleId, Resource};
pub use provider::{ProviderBlock, decode_provider_block};
