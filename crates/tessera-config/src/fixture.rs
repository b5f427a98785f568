//! JSON module-tree fixtures.
//!
//! Fixtures describe a configuration without going through a document
//! parser. A module is an object with optional `resources`, `providers` and
//! `modules` members; child modules may add an explicit `providerMap`
//! (the module call's `providers` argument):
//!
//! ```json
//! {
//!   "providers": [{ "name": "aws", "attributes": { "alias": "east" } }],
//!   "resources": [{ "type": "aws_instance", "name": "web", "provider": "aws.east" }],
//!   "modules": {
//!     "net": {
//!       "providerMap": { "aws": "aws.east" },
//!       "resources": [{ "type": "aws_vpc", "name": "main" }]
//!     }
//!   }
//! }
//! ```
//!
//! Attribute values are literals, or `{ "$ref": "var.name" }` for a
//! reference.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::addrs::{ModulePath, ResourceAddress, ResourceMode, parse_provider_config_compact_str};
use crate::body::{Block, MemoryBody};
use crate::error::Diagnostics;
use crate::expr::Expr;
use crate::foundation::Span;
use crate::module::{Config, ModuleCall, ModuleId, Resource};
use crate::traversal::parse_traversal_abs;
use crate::value::Value;

/// Errors that can occur when loading a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Failed to read the fixture file.
    #[error("failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the fixture JSON.
    #[error("failed to parse fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for fixture loading.
pub type FixtureResult<T> = Result<T, FixtureError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleFixture {
    #[serde(default)]
    resources: Vec<ResourceFixture>,
    #[serde(default)]
    providers: Vec<ProviderFixture>,
    #[serde(default)]
    modules: IndexMap<String, CallFixture>,
}

#[derive(Debug, Deserialize)]
struct CallFixture {
    #[serde(default, rename = "providerMap")]
    provider_map: Option<IndexMap<String, String>>,
    #[serde(flatten)]
    module: ModuleFixture,
}

#[derive(Debug, Deserialize)]
struct ResourceFixture {
    #[serde(rename = "type")]
    type_name: String,
    name: String,
    #[serde(default)]
    mode: Option<ResourceMode>,
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderFixture {
    name: String,
    #[serde(default)]
    attributes: IndexMap<String, ExprFixture>,
    #[serde(default)]
    blocks: Vec<BlockFixture>,
}

#[derive(Debug, Deserialize)]
struct BlockFixture {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    attributes: IndexMap<String, ExprFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExprFixture {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Literal(Value),
}

impl Config {
    /// Build a configuration from fixture JSON.
    ///
    /// Structural problems are errors; problems in the described
    /// configuration itself come back as diagnostics.
    pub fn from_fixture_json(json: &str) -> FixtureResult<(Config, Diagnostics)> {
        Self::from_fixture_named(json, "fixture.json")
    }

    /// Load a fixture file.
    pub fn load_fixture(path: impl AsRef<Path>) -> FixtureResult<(Config, Diagnostics)> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_fixture_named(&content, &path.display().to_string())
    }

    fn from_fixture_named(json: &str, file: &str) -> FixtureResult<(Config, Diagnostics)> {
        let fixture: ModuleFixture = serde_json::from_str(json)?;
        let mut config = Config::new();
        let mut diags = Diagnostics::new();
        let root = config.root();
        populate(&mut config, root, &fixture, file, &mut diags);
        Ok((config, diags))
    }
}

fn populate(
    config: &mut Config,
    id: ModuleId,
    fixture: &ModuleFixture,
    file: &str,
    diags: &mut Diagnostics,
) {
    let path = config.module(id).path.clone();
    let span = Span::zero(file);

    for res in &fixture.resources {
        let mode = res.mode.unwrap_or(ResourceMode::Managed);
        let addr =
            ResourceAddress::new(path.clone(), mode, res.type_name.clone(), res.name.clone());
        let mut resource = Resource::new(addr, span.clone());
        if let Some(provider) = &res.provider {
            match parse_traversal_abs(provider, file) {
                Ok(traversal) => diags.append(&mut resource.set_provider_traversal(&traversal)),
                Err(mut e) => diags.append(&mut e),
            }
        }
        config.module_mut(id).add_resource(resource);
    }

    for provider in &fixture.providers {
        let mut body = attributes_body(&provider.attributes, &span, file, diags);
        for block in &provider.blocks {
            let nested = attributes_body(&block.attributes, &span, file, diags);
            body = body.with_block(Block::new(
                block.type_name.clone(),
                nested.into_arc(),
                span.clone(),
            ));
        }
        let block = Block::new("provider", body.into_arc(), span.clone())
            .with_labels(vec![provider.name.clone()]);
        diags.append(&mut config.module_mut(id).add_provider_block(&block));
    }

    for (name, call_fixture) in &fixture.modules {
        let mut call = ModuleCall::new(name.clone(), span.clone());
        if let Some(mapping) = &call_fixture.provider_map {
            call.providers = Some(IndexMap::new());
            for (child, parent) in mapping {
                let (child_addr, mut child_diags) = parse_provider_config_compact_str(child);
                let (parent_addr, mut parent_diags) = parse_provider_config_compact_str(parent);
                let invalid = child_diags.has_errors() || parent_diags.has_errors();
                diags.append(&mut child_diags);
                diags.append(&mut parent_diags);
                if !invalid {
                    call = call.with_provider(child_addr, parent_addr);
                }
            }
        }
        let child = config.add_child(id, call);
        populate(config, child, &call_fixture.module, file, diags);
    }
}

fn attributes_body(
    attributes: &IndexMap<String, ExprFixture>,
    span: &Span,
    file: &str,
    diags: &mut Diagnostics,
) -> MemoryBody {
    let mut body = MemoryBody::new(span.clone());
    for (name, value) in attributes {
        let expr = match value {
            ExprFixture::Literal(v) => Expr::literal(v.clone()).with_span(span.clone()),
            ExprFixture::Reference { reference } => match parse_traversal_abs(reference, file) {
                Ok(traversal) => Expr::reference(traversal),
                Err(mut e) => {
                    diags.append(&mut e);
                    continue;
                }
            },
        };
        body = body.with_attribute(name.clone(), expr);
    }
    body
}

/// Path of a module described by dotted call names, e.g. `"sub.subsub"`.
pub fn module_path(calls: &str) -> ModulePath {
    if calls.is_empty() {
        return ModulePath::root();
    }
    ModulePath::new(calls.split('.').map(str::to_string).collect())
}
