//! Provider vertices and their wiring.
//!
//! # Resolution
//!
//! A resource asks for a module-relative provider address. Resolution looks
//! for a provider vertex with exactly that address in the resource's own
//! module, then climbs towards the root one module call at a time:
//!
//! - through a call with an explicit `providers` mapping, the address is
//!   translated to its parent-side address (which may be aliased), and
//!   nothing outside the mapping passes through
//! - through a call without a mapping, only an unaliased address passes
//!
//! The first match wins. When nothing matches, an unaliased address gets an
//! implicit default instance: in the resource's own module, or in the module
//! a mapping translated it into. Aliased addresses never get one.

use tessera_config::addrs::{
    AbsProviderAddress, ModulePath, ProviderAddress, ResourceAddress, ResourceMode,
};
use tessera_config::error::{Diagnostic, DiagnosticKind, Diagnostics};
use tessera_config::expand::{Provider, expand_provider_block};
use tessera_config::module::{Config, ModuleId};
use tessera_config::traversal::TraverseStep;
use tracing::{debug, trace};

use super::StageInput;
use crate::dag::{GraphVertex, VertexId};
use crate::error::Result;
use crate::vertex::{CloseProviderNode, GraphNode, ProviderGraph, ProviderNode, ResourceNode};

/// Reference roots that never name a resource.
const NON_RESOURCE_ROOTS: &[&str] = &[
    "var",
    "local",
    "each",
    "count",
    "path",
    "module",
    "terraform",
    "self",
];

/// Add one vertex per provider instance of every module.
///
/// Each provider also depends on the same-module resources its configuration
/// refers to.
pub fn add_providers(graph: &mut ProviderGraph, input: &StageInput<'_>) -> Result<Diagnostics> {
    let mut diags = Diagnostics::new();

    for (module_id, module) in input.config.modules() {
        for block in &module.provider_blocks {
            let (instances, mut expand_diags) =
                expand_provider_block(block, &module.path, input.evaluator);
            diags.append(&mut expand_diags);

            for provider in instances {
                let addr = AbsProviderAddress::new(module.path.clone(), provider.addr());
                if let Some(existing) = graph.find_provider(&addr) {
                    diags.push(duplicate_provider(graph, existing, &provider));
                    continue;
                }

                let references = referenced_resources(&provider, &module.path);
                let id = graph.add(GraphNode::Provider(ProviderNode {
                    addr,
                    module: module_id,
                    config: Some(provider),
                }));
                for resource_addr in references {
                    if let Some(resource) = graph.find_resource(&resource_addr) {
                        if graph.would_cycle(id, resource) {
                            diags.push(cycle_diagnostic(graph, id, resource));
                            continue;
                        }
                        graph.connect(id, resource)?;
                    }
                }
            }
        }
    }

    Ok(diags)
}

fn duplicate_provider(
    graph: &ProviderGraph,
    existing: VertexId,
    provider: &Provider,
) -> Diagnostic {
    let previous = graph
        .vertex(existing)
        .and_then(GraphNode::as_provider)
        .and_then(|p| p.config.as_ref())
        .map(|c| c.decl_range.to_string())
        .unwrap_or_default();
    let (summary, detail) = if provider.alias.is_empty() {
        (
            "Duplicate provider configuration",
            format!(
                "A default (non-aliased) provider configuration for {:?} was already given at {previous}. If multiple configurations are required, set the \"alias\" argument for alternative configurations.",
                provider.name
            ),
        )
    } else {
        (
            "Duplicate provider configuration with alias",
            format!(
                "An alternate provider configuration for {:?} with alias {:?} was already given at {previous}. Each configuration for the same provider must have a distinct alias.",
                provider.name, provider.alias
            ),
        )
    };
    Diagnostic::error(DiagnosticKind::DuplicateProviderConfig, summary, detail)
        .with_subject(provider.decl_range.clone())
}

fn referenced_resources(provider: &Provider, module: &ModulePath) -> Vec<ResourceAddress> {
    let mut out = Vec::new();
    for attr in provider.config.just_attributes().values() {
        for traversal in attr.expr.references() {
            let names: Vec<&str> = traversal.steps().iter().map_while(TraverseStep::name).collect();
            let addr = match names.as_slice() {
                ["data", type_name, name, ..] => {
                    ResourceAddress::new(module.clone(), ResourceMode::Data, *type_name, *name)
                }
                [type_name, name, ..] if !NON_RESOURCE_ROOTS.contains(type_name) => {
                    ResourceAddress::new(module.clone(), ResourceMode::Managed, *type_name, *name)
                }
                _ => continue,
            };
            if !out.contains(&addr) {
                out.push(addr);
            }
        }
    }
    out
}

/// Outcome of a provider search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    Found(VertexId),
    NotFound {
        /// Last address searched for
        last: AbsProviderAddress,
        /// The address was translated by an explicit `providers` mapping
        passed: bool,
    },
}

/// Find the provider vertex serving `resource`.
pub(crate) fn resolve_provider(
    graph: &ProviderGraph,
    config: &Config,
    resource: &ResourceNode,
) -> std::result::Result<Resolution, Diagnostic> {
    let mut module = resource.module;
    let mut addr = resource.required.clone();
    let mut passed = false;
    let mut in_progress: Vec<(ModuleId, ProviderAddress)> = Vec::new();

    // Each step moves one module towards the root, so the tree size bounds
    // the search.
    for _ in 0..config.len() {
        if in_progress.iter().any(|(m, a)| *m == module && *a == addr) {
            return Err(resolution_cycle(config, resource, &in_progress));
        }
        in_progress.push((module, addr.clone()));

        let path = &config.module(module).path;
        match graph.providers_at(path, &addr).as_slice() {
            [found] => {
                trace!(
                    resource = %resource.addr,
                    provider = %AbsProviderAddress::new(path.clone(), addr.clone()),
                    "resolved provider"
                );
                return Ok(Resolution::Found(*found));
            }
            [] => {}
            candidates => {
                return Err(Diagnostic::error(
                    DiagnosticKind::ProviderResolutionAmbiguous,
                    "Ambiguous provider configuration",
                    format!(
                        "{} matches {} provider configurations for {}; exactly one is required.",
                        resource.addr,
                        candidates.len(),
                        AbsProviderAddress::new(path.clone(), addr.clone()),
                    ),
                )
                .with_subject(resource.decl_range.clone()));
            }
        }

        let not_found = |addr: ProviderAddress, passed: bool| {
            Ok(Resolution::NotFound {
                last: AbsProviderAddress::new(path.clone(), addr),
                passed,
            })
        };
        let (Some(parent), Some(call)) = (config.parent(module), config.call(module)) else {
            return not_found(addr, passed);
        };
        match &call.providers {
            Some(mapping) => match mapping.get(&addr) {
                Some(parent_addr) => {
                    trace!(
                        call = %call.name,
                        from = %addr,
                        to = %parent_addr,
                        "provider passed by module call"
                    );
                    addr = parent_addr.clone();
                    passed = true;
                }
                None => return not_found(addr, passed),
            },
            None if addr.is_aliased() => return not_found(addr, passed),
            None => {}
        }
        module = parent;
    }

    Err(resolution_cycle(config, resource, &in_progress))
}

fn resolution_cycle(
    config: &Config,
    resource: &ResourceNode,
    path: &[(ModuleId, ProviderAddress)],
) -> Diagnostic {
    let chain = path
        .iter()
        .map(|(m, a)| {
            AbsProviderAddress::new(config.module(*m).path.clone(), a.clone()).to_string()
        })
        .collect::<Vec<_>>()
        .join(" -> ");
    Diagnostic::error(
        DiagnosticKind::CycleDetected,
        "Cycle in provider resolution",
        format!(
            "Resolving the provider for {} revisits a configuration already in progress: {chain}.",
            resource.addr
        ),
    )
    .with_subject(resource.decl_range.clone())
}

fn provider_not_present(resource: &ResourceNode, last: &AbsProviderAddress) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::ProviderNotPresent,
        "Provider configuration not present",
        format!(
            "To work with {} its provider configuration {last} is required, but it is not declared. Aliased provider configurations are never created implicitly; declare it in this module or pass it in with the module call's \"providers\" argument.",
            resource.addr
        ),
    )
    .with_subject(resource.decl_range.clone())
}

fn cycle_diagnostic(graph: &ProviderGraph, from: VertexId, to: VertexId) -> Diagnostic {
    let name = |id: VertexId| graph.vertex(id).map(GraphVertex::name).unwrap_or_default();
    Diagnostic::error(
        DiagnosticKind::CycleDetected,
        "Cycle detected",
        format!("Adding the dependency {} -> {} would create a cycle.", name(from), name(to)),
    )
}

fn provider_addr(graph: &ProviderGraph, id: VertexId) -> Option<AbsProviderAddress> {
    graph
        .vertex(id)
        .and_then(GraphNode::as_provider)
        .map(|p| p.addr.clone())
}

fn resource_node(graph: &ProviderGraph, id: VertexId) -> Option<ResourceNode> {
    graph.vertex(id).and_then(GraphNode::as_resource).cloned()
}

/// Synthesize implicit default providers for resources nothing serves.
pub fn add_missing_providers(
    graph: &mut ProviderGraph,
    input: &StageInput<'_>,
) -> Result<Diagnostics> {
    let mut diags = Diagnostics::new();
    for id in graph.resource_ids() {
        let Some(resource) = resource_node(graph, id) else {
            continue;
        };
        let (addr, module) = match resolve_provider(graph, input.config, &resource) {
            Ok(Resolution::Found(_)) => continue,
            Ok(Resolution::NotFound { last, .. }) if last.addr.is_aliased() => {
                diags.push(provider_not_present(&resource, &last));
                continue;
            }
            // A translated address belongs to the module the search stopped in.
            Ok(Resolution::NotFound { last, passed: true }) => {
                match input.config.find(&last.module) {
                    Some(module) => (last, module),
                    None => {
                        diags.push(provider_not_present(&resource, &last));
                        continue;
                    }
                }
            }
            Ok(Resolution::NotFound { passed: false, .. }) => (
                AbsProviderAddress::new(resource.addr.module.clone(), resource.required.clone()),
                resource.module,
            ),
            Err(diag) => {
                diags.push(diag);
                continue;
            }
        };
        debug!(provider = %addr, resource = %resource.addr, "adding implicit provider");
        graph.add(GraphNode::Provider(ProviderNode {
            addr,
            module,
            config: None,
        }));
    }
    Ok(diags)
}

/// Connect every resource to the provider serving it.
pub fn wire_providers(graph: &mut ProviderGraph, input: &StageInput<'_>) -> Result<Diagnostics> {
    let mut diags = Diagnostics::new();
    for id in graph.resource_ids() {
        let Some(resource) = resource_node(graph, id) else {
            continue;
        };
        match resolve_provider(graph, input.config, &resource) {
            Ok(Resolution::Found(provider)) => {
                if graph.would_cycle(id, provider) {
                    diags.push(
                        cycle_diagnostic(graph, id, provider)
                            .with_subject(resource.decl_range.clone()),
                    );
                    continue;
                }
                graph.connect(id, provider)?;
            }
            Ok(Resolution::NotFound { last, .. }) => {
                diags.push(provider_not_present(&resource, &last));
            }
            Err(diag) => diags.push(diag),
        }
    }
    Ok(diags)
}

/// Add a close vertex for every provider.
///
/// The close vertex depends on its provider and on everything that depends
/// on the provider, so it is visited last.
pub fn add_close_providers(
    graph: &mut ProviderGraph,
    _input: &StageInput<'_>,
) -> Result<Diagnostics> {
    let mut diags = Diagnostics::new();
    for provider in graph.provider_ids() {
        let Some(addr) = provider_addr(graph, provider) else {
            continue;
        };
        let dependents: Vec<VertexId> = graph.up_edges(provider).collect();
        let close = graph.add(GraphNode::CloseProvider(CloseProviderNode { provider: addr }));
        for target in std::iter::once(provider).chain(dependents) {
            if graph.would_cycle(close, target) {
                diags.push(cycle_diagnostic(graph, close, target));
                continue;
            }
            graph.connect(close, target)?;
        }
    }
    Ok(diags)
}

/// Remove providers no resource depends on, together with their close
/// vertices.
pub fn prune_providers(graph: &mut ProviderGraph, _input: &StageInput<'_>) -> Result<Diagnostics> {
    for provider in graph.provider_ids() {
        let used = graph
            .up_edges(provider)
            .any(|d| graph.vertex(d).is_some_and(GraphNode::is_resource));
        if used {
            continue;
        }
        let Some(addr) = provider_addr(graph, provider) else {
            continue;
        };
        if let Some(close) = graph.find_close(&addr) {
            graph.remove(close)?;
        }
        graph.remove(provider)?;
        debug!(provider = %addr, "pruned unused provider");
    }
    Ok(Diagnostics::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_config::foundation::Span;
    use tessera_config::module::{ModuleCall, Resource};

    fn resource(
        graph: &mut ProviderGraph,
        config: &Config,
        module: ModuleId,
        type_name: &str,
    ) -> VertexId {
        let path = config.module(module).path.clone();
        let r = Resource::managed(path, type_name, "x");
        graph.add(GraphNode::Resource(ResourceNode {
            addr: r.addr.clone(),
            module,
            required: r.required_provider(),
            decl_range: r.decl_range.clone(),
        }))
    }

    fn implicit(
        graph: &mut ProviderGraph,
        path: ModulePath,
        module: ModuleId,
        addr: ProviderAddress,
    ) -> VertexId {
        graph.add(GraphNode::Provider(ProviderNode {
            addr: AbsProviderAddress::new(path, addr),
            module,
            config: None,
        }))
    }

    #[test]
    fn test_resolution_climbs_for_unaliased_only() {
        let mut config = Config::new();
        let root = config.root();
        let sub = config.add_child(root, ModuleCall::new("sub", Span::synthetic()));

        let mut graph = ProviderGraph::new();
        let res = resource(&mut graph, &config, sub, "aws_instance");
        let aws = implicit(&mut graph, ModulePath::root(), root, ProviderAddress::new("aws"));
        implicit(&mut graph, ModulePath::root(), root, ProviderAddress::aliased("aws", "east"));

        let node = resource_node(&graph, res).unwrap();
        assert_eq!(resolve_provider(&graph, &config, &node).unwrap(), Resolution::Found(aws));

        let mut aliased = node.clone();
        aliased.required = ProviderAddress::aliased("aws", "east");
        assert!(matches!(
            resolve_provider(&graph, &config, &aliased).unwrap(),
            Resolution::NotFound { passed: false, .. }
        ));
    }

    #[test]
    fn test_resolution_ambiguous() {
        let config = Config::new();
        let root = config.root();
        let mut graph = ProviderGraph::new();
        resource(&mut graph, &config, root, "aws_instance");
        implicit(&mut graph, ModulePath::root(), root, ProviderAddress::new("aws"));
        implicit(&mut graph, ModulePath::root(), root, ProviderAddress::new("aws"));

        let diags = wire_providers(&mut graph, &StageInput::new(&config)).unwrap();
        assert_eq!(diags.count_kind(DiagnosticKind::ProviderResolutionAmbiguous), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_mapping_blocks_implicit_inheritance() {
        let mut config = Config::new();
        let root = config.root();
        let call = ModuleCall::new("sub", Span::synthetic())
            .with_provider(ProviderAddress::new("google"), ProviderAddress::new("google"));
        let sub = config.add_child(root, call);

        let mut graph = ProviderGraph::new();
        let res = resource(&mut graph, &config, sub, "aws_instance");
        implicit(&mut graph, ModulePath::root(), root, ProviderAddress::new("aws"));

        let node = resource_node(&graph, res).unwrap();
        assert!(matches!(
            resolve_provider(&graph, &config, &node).unwrap(),
            Resolution::NotFound { passed: false, .. }
        ));
    }

    #[test]
    fn test_passed_provider_missing_in_parent() {
        let mut config = Config::new();
        let root = config.root();
        let call = ModuleCall::new("sub", Span::synthetic())
            .with_provider(ProviderAddress::new("aws"), ProviderAddress::aliased("aws", "east"));
        let sub = config.add_child(root, call);

        let mut graph = ProviderGraph::new();
        resource(&mut graph, &config, sub, "aws_instance");

        let diags = add_missing_providers(&mut graph, &StageInput::new(&config)).unwrap();
        assert!(diags.contains_kind(DiagnosticKind::ProviderNotPresent));
        assert!(diags.iter().next().unwrap().detail.contains(r#"provider["aws"].east"#));
        assert!(graph.provider_ids().is_empty());
    }

    #[test]
    fn test_passed_unaliased_default_lands_in_parent() {
        let mut config = Config::new();
        let root = config.root();
        let call = ModuleCall::new("sub", Span::synthetic())
            .with_provider(ProviderAddress::new("aws"), ProviderAddress::new("aws"));
        let sub = config.add_child(root, call);

        let mut graph = ProviderGraph::new();
        let res = resource(&mut graph, &config, sub, "aws_instance");

        let diags = add_missing_providers(&mut graph, &StageInput::new(&config)).unwrap();
        assert!(diags.is_empty());
        let root_aws = AbsProviderAddress::new(ModulePath::root(), ProviderAddress::new("aws"));
        let provider = graph.find_provider(&root_aws).unwrap();
        assert_eq!(graph.provider_ids(), vec![provider]);

        let node = resource_node(&graph, res).unwrap();
        assert_eq!(resolve_provider(&graph, &config, &node).unwrap(), Resolution::Found(provider));
    }

    #[test]
    fn test_wire_refuses_cycle() {
        let config = Config::new();
        let root = config.root();
        let mut graph = ProviderGraph::new();
        let res = resource(&mut graph, &config, root, "aws_instance");
        let aws = implicit(&mut graph, ModulePath::root(), root, ProviderAddress::new("aws"));
        graph.connect(aws, res).unwrap();

        let diags = wire_providers(&mut graph, &StageInput::new(&config)).unwrap();
        assert!(diags.contains_kind(DiagnosticKind::CycleDetected));
        assert!(!graph.has_edge(res, aws));
    }
}
