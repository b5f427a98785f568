//! Shared helpers for graph integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use tessera_config::eval::StaticEvaluator;
use tessera_config::module::Config;
use tessera_graph::dag::GraphVertex;
use tessera_graph::{BuildError, BuildOptions, BuildOutput, GraphNode, ProviderGraph, build_graph};
use tracing_subscriber::{EnvFilter, fmt};

/// Install a test-friendly subscriber once. `RUST_LOG` overrides the filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tessera_graph=debug"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Parse a fixture, failing the test on any load diagnostic error.
pub fn config(json: &str) -> Config {
    let (config, diags) = Config::from_fixture_json(json).unwrap();
    assert!(!diags.has_errors(), "fixture diagnostics:\n{diags}");
    config
}

pub fn try_build(
    json: &str,
    evaluator: Option<&dyn StaticEvaluator>,
    options: &BuildOptions,
) -> Result<BuildOutput, BuildError> {
    init_logging();
    build_graph(&config(json), evaluator, options)
}

pub fn build_with(json: &str, options: &BuildOptions) -> ProviderGraph {
    match try_build(json, None, options) {
        Ok(output) => output.graph,
        Err(err) => panic!("build failed: {err}"),
    }
}

/// Full pipeline, no evaluator.
pub fn build(json: &str) -> ProviderGraph {
    build_with(json, &BuildOptions::default())
}

/// Compare renderings, ignoring surrounding whitespace of the expectation.
pub fn assert_rendering(graph: &ProviderGraph, expected: &str) {
    let actual = graph.render();
    let expected = expected
        .trim()
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(actual, expected, "\nactual:\n{actual}\n\nexpected:\n{expected}\n");
}

/// Structural guarantees of a finished graph.
pub fn assert_invariants(graph: &ProviderGraph) {
    assert!(graph.cycles().is_empty(), "graph has cycles");
    for (id, vertex) in graph.vertices() {
        match vertex {
            GraphNode::Resource(_) => {
                let providers = graph
                    .down_edges(id)
                    .filter(|d| graph.vertex(*d).is_some_and(|v| v.as_provider().is_some()))
                    .count();
                assert_eq!(providers, 1, "{} must use exactly one provider", vertex.name());
            }
            GraphNode::Provider(p) => {
                let used = graph
                    .ancestors(id)
                    .iter()
                    .any(|a| graph.vertex(*a).is_some_and(GraphNode::is_resource));
                assert!(used, "{} is unused", vertex.name());
                assert!(
                    graph.find_close(&p.addr).is_some(),
                    "{} has no close vertex",
                    vertex.name()
                );
            }
            GraphNode::CloseProvider(c) => {
                assert!(graph.find_provider(&c.provider).is_some());
            }
        }
    }
}
