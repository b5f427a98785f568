//! Resource vertices from the module tree.

use tessera_config::error::Diagnostics;
use tessera_config::module::{Config, ModuleId};

use super::StageInput;
use crate::error::Result;
use crate::vertex::{GraphNode, ProviderGraph, ResourceNode};

/// Add one vertex per managed resource and data source, walking the module
/// tree depth-first from the root.
pub fn add_resources(graph: &mut ProviderGraph, input: &StageInput<'_>) -> Result<Diagnostics> {
    add_module(graph, input.config, input.config.root());
    Ok(Diagnostics::new())
}

fn add_module(graph: &mut ProviderGraph, config: &Config, id: ModuleId) {
    for resource in &config.module(id).resources {
        graph.add(GraphNode::Resource(ResourceNode {
            addr: resource.addr.clone(),
            module: id,
            required: resource.required_provider(),
            decl_range: resource.decl_range.clone(),
        }));
    }
    for child in config.children(id) {
        add_module(graph, config, *child);
    }
}
