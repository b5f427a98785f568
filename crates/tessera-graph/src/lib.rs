//! Provider wiring and execution graph construction.
//!
//! Builds the directed acyclic graph an executor walks: one vertex per
//! resource, one per provider instance, and one close vertex per provider,
//! with every resource wired to exactly one provider.
//!
//! # Modules
//!
//! - `dag` - generic dependency graph
//! - `vertex` - resource, provider and close vertices
//! - `transform` - the individual graph transforms
//! - `pipeline` - ordered stage list and orchestrator
//! - `options` - pipeline options
//! - `error` - library errors

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod dag;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod transform;
pub mod vertex;

pub use error::{BuildError, GraphError};
pub use options::BuildOptions;
pub use pipeline::{BuildOutput, StageKind, build_graph};
pub use vertex::{GraphNode, ProviderGraph};
