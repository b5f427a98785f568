//! Vertices of the provider graph.
//!
//! A vertex is a resource, a provider instance, or the close vertex of a
//! provider. Names follow the address renderings:
//!
//! - `module.sub.aws_instance.web`
//! - `provider["aws"].east`
//! - `provider["aws"].east (close)`

use tessera_config::addrs::{AbsProviderAddress, ModulePath, ProviderAddress, ResourceAddress};
use tessera_config::expand::Provider;
use tessera_config::foundation::Span;
use tessera_config::module::ModuleId;

use crate::dag::{Graph, GraphVertex, VertexId};

/// Graph built by the pipeline.
pub type ProviderGraph = Graph<GraphNode>;

/// Vertex payload.
#[derive(Debug, Clone)]
pub enum GraphNode {
    Resource(ResourceNode),
    Provider(ProviderNode),
    CloseProvider(CloseProviderNode),
}

/// A managed resource or data source.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub addr: ResourceAddress,
    pub module: ModuleId,
    /// Module-relative provider the resource asks for
    pub required: ProviderAddress,
    pub decl_range: Span,
}

/// A provider instance.
#[derive(Debug, Clone)]
pub struct ProviderNode {
    pub addr: AbsProviderAddress,
    pub module: ModuleId,
    /// Declared instance; None for a synthesized implicit default
    pub config: Option<Provider>,
}

impl ProviderNode {
    /// True for a default synthesized because nothing was declared.
    pub fn is_implicit(&self) -> bool {
        self.config.is_none()
    }
}

/// Teardown point of a provider: runs after everything using it.
#[derive(Debug, Clone)]
pub struct CloseProviderNode {
    pub provider: AbsProviderAddress,
}

impl GraphVertex for GraphNode {
    fn name(&self) -> String {
        match self {
            GraphNode::Resource(r) => r.addr.to_string(),
            GraphNode::Provider(p) => p.addr.to_string(),
            GraphNode::CloseProvider(c) => format!("{} (close)", c.provider),
        }
    }
}

impl GraphNode {
    pub fn as_resource(&self) -> Option<&ResourceNode> {
        match self {
            GraphNode::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_provider(&self) -> Option<&ProviderNode> {
        match self {
            GraphNode::Provider(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, GraphNode::Resource(_))
    }
}

impl Graph<GraphNode> {
    /// Resource vertices in insertion order.
    pub fn resource_ids(&self) -> Vec<VertexId> {
        self.vertices()
            .filter(|(_, v)| v.is_resource())
            .map(|(id, _)| id)
            .collect()
    }

    /// Provider vertices in insertion order.
    pub fn provider_ids(&self) -> Vec<VertexId> {
        self.vertices()
            .filter(|(_, v)| v.as_provider().is_some())
            .map(|(id, _)| id)
            .collect()
    }

    /// Every provider vertex for `addr` declared in `module`.
    pub fn providers_at(&self, module: &ModulePath, addr: &ProviderAddress) -> Vec<VertexId> {
        self.vertices()
            .filter(|(_, v)| {
                v.as_provider()
                    .is_some_and(|p| &p.addr.module == module && &p.addr.addr == addr)
            })
            .map(|(id, _)| id)
            .collect()
    }

    pub fn find_resource(&self, addr: &ResourceAddress) -> Option<VertexId> {
        self.find(|v| v.as_resource().is_some_and(|r| &r.addr == addr))
    }

    pub fn find_provider(&self, addr: &AbsProviderAddress) -> Option<VertexId> {
        self.find(|v| v.as_provider().is_some_and(|p| &p.addr == addr))
    }

    pub fn find_close(&self, provider: &AbsProviderAddress) -> Option<VertexId> {
        self.find(|v| matches!(v, GraphNode::CloseProvider(c) if &c.provider == provider))
    }

    /// Look a vertex up by its rendered name.
    pub fn find_named(&self, name: &str) -> Option<VertexId> {
        self.find(|v| v.name() == name)
    }
}
