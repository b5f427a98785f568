//! Module tree collaborator.
//!
//! [`Config`] is an arena of modules indexed by [`ModuleId`]; the root is
//! always `ModuleId(0)`. Each non-root module remembers the [`ModuleCall`]
//! that created it, including any explicit `providers` mapping.
//!
//! # Examples
//!
//! ```
//! # use tessera_config::addrs::*;
//! # use tessera_config::module::*;
//! # use tessera_config::foundation::Span;
//! let mut config = Config::new();
//! let root = config.root();
//! let child = config.add_child(root, ModuleCall::new("net", Span::synthetic()));
//! let vpc = Resource::managed(ModulePath::root().child("net"), "aws_vpc", "main");
//! config.module_mut(child).add_resource(vpc);
//!
//! assert_eq!(config.parent(child), Some(root));
//! assert_eq!(config.module(child).path.to_string(), "module.net");
//! ```

use indexmap::IndexMap;

use crate::addrs::{
    ModulePath, ProviderAddress, ResourceAddress, ResourceMode, parse_provider_config_compact,
};
use crate::body::Block;
use crate::error::Diagnostics;
use crate::foundation::Span;
use crate::provider::{ProviderBlock, decode_provider_block};
use crate::traversal::Traversal;

/// Index of a module in a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub usize);

/// A `module "name" { ... }` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleCall {
    pub name: String,
    /// Explicit `providers = { child = parent }` mapping.
    ///
    /// When present, the child receives exactly these providers and nothing
    /// is inherited implicitly through this call.
    pub providers: Option<IndexMap<ProviderAddress, ProviderAddress>>,
    pub span: Span,
}

impl ModuleCall {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            providers: None,
            span,
        }
    }

    pub fn with_provider(mut self, child: ProviderAddress, parent: ProviderAddress) -> Self {
        self.providers.get_or_insert_with(IndexMap::new).insert(child, parent);
        self
    }
}

/// A managed resource or data source declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub addr: ResourceAddress,
    /// Explicit `provider = type.alias` reference
    pub provider: Option<(ProviderAddress, Span)>,
    pub decl_range: Span,
}

impl Resource {
    pub fn new(addr: ResourceAddress, decl_range: Span) -> Self {
        Self {
            addr,
            provider: None,
            decl_range,
        }
    }

    pub fn managed(module: ModulePath, type_name: &str, name: &str) -> Self {
        Self::new(
            ResourceAddress::new(module, ResourceMode::Managed, type_name, name),
            Span::synthetic(),
        )
    }

    pub fn data(module: ModulePath, type_name: &str, name: &str) -> Self {
        Self::new(
            ResourceAddress::new(module, ResourceMode::Data, type_name, name),
            Span::synthetic(),
        )
    }

    /// Set the explicit provider from a `provider` argument traversal.
    ///
    /// The reference is left unset when the traversal is not a valid compact
    /// address.
    pub fn set_provider_traversal(&mut self, traversal: &Traversal) -> Diagnostics {
        let (addr, diags) = parse_provider_config_compact(traversal);
        if !diags.has_errors() {
            self.provider = Some((addr, traversal.span()));
        }
        diags
    }

    pub fn with_provider(mut self, addr: ProviderAddress) -> Self {
        self.provider = Some((addr, self.decl_range.clone()));
        self
    }

    /// The provider configuration this resource needs, module-relative.
    pub fn required_provider(&self) -> ProviderAddress {
        match &self.provider {
            Some((addr, _)) => addr.clone(),
            None => ProviderAddress::new(self.addr.implied_provider()),
        }
    }
}

/// One module of the tree.
#[derive(Debug, Clone)]
pub struct Module {
    pub path: ModulePath,
    pub resources: Vec<Resource>,
    pub provider_blocks: Vec<ProviderBlock>,
    /// None for the root module
    pub call: Option<ModuleCall>,
}

impl Module {
    fn new(path: ModulePath, call: Option<ModuleCall>) -> Self {
        Self {
            path,
            resources: Vec::new(),
            provider_blocks: Vec::new(),
            call,
        }
    }

    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    /// Decode and add a `provider` block.
    ///
    /// Declarations that fail to decode at all are dropped; the diagnostics
    /// explain why.
    pub fn add_provider_block(&mut self, block: &Block) -> Diagnostics {
        let (decl, diags) = decode_provider_block(block);
        if let Some(decl) = decl {
            self.provider_blocks.push(decl);
        }
        diags
    }
}

#[derive(Debug, Clone)]
struct ModuleNode {
    module: Module,
    parent: Option<ModuleId>,
    children: Vec<ModuleId>,
}

/// Whole configuration: the module tree.
#[derive(Debug, Clone)]
pub struct Config {
    nodes: Vec<ModuleNode>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Configuration with an empty root module.
    pub fn new() -> Self {
        Self {
            nodes: vec![ModuleNode {
                module: Module::new(ModulePath::root(), None),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> ModuleId {
        ModuleId(0)
    }

    /// # Panics
    /// Panics if `id` does not belong to this configuration.
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.nodes[id.0].module
    }

    /// # Panics
    /// Panics if `id` does not belong to this configuration.
    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.nodes[id.0].module
    }

    pub fn parent(&self, id: ModuleId) -> Option<ModuleId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ModuleId) -> &[ModuleId] {
        self.nodes.get(id.0).map_or(&[], |n| n.children.as_slice())
    }

    /// The call that created module `id`, None for the root.
    pub fn call(&self, id: ModuleId) -> Option<&ModuleCall> {
        self.nodes.get(id.0).and_then(|n| n.module.call.as_ref())
    }

    /// All modules in creation order (parents before children).
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (ModuleId(i), &n.module))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a module by path.
    pub fn find(&self, path: &ModulePath) -> Option<ModuleId> {
        self.modules().find(|(_, m)| &m.path == path).map(|(id, _)| id)
    }

    /// Add a child module under `parent`.
    pub fn add_child(&mut self, parent: ModuleId, call: ModuleCall) -> ModuleId {
        let path = self.module(parent).path.child(call.name.clone());
        let id = ModuleId(self.nodes.len());
        self.nodes.push(ModuleNode {
            module: Module::new(path, Some(call)),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}
