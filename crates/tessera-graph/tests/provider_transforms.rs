//! End-to-end provider wiring scenarios.
//!
//! Each test builds a module tree from fixture JSON, runs the pipeline (in
//! full, or up to a named stage) and compares the rendered graph.

mod common;

use common::{assert_invariants, assert_rendering, build, build_with, try_build};
use tessera_config::error::DiagnosticKind;
use tessera_config::eval::StaticValues;
use tessera_config::value::Value;
use tessera_graph::{BuildError, BuildOptions, StageKind};

const BASIC: &str = r#"{
    "providers": [{ "name": "aws" }],
    "resources": [{ "type": "aws_instance", "name": "web" }]
}"#;

fn halted(err: BuildError) -> (StageKind, tessera_config::error::Diagnostics) {
    match err {
        BuildError::Halted { stage, diagnostics } => (stage, diagnostics),
        other => panic!("expected a halted build, got {other}"),
    }
}

#[test]
fn test_provider_wiring() {
    let graph = build_with(BASIC, &BuildOptions::default().stop_after(StageKind::Wire));
    assert_rendering(
        &graph,
        r#"
aws_instance.web
  provider["aws"]
provider["aws"]
"#,
    );
}

#[test]
fn test_close_provider() {
    let graph = build_with(BASIC, &BuildOptions::default().stop_after(StageKind::Prune));
    assert_rendering(
        &graph,
        r#"
aws_instance.web
  provider["aws"]
provider["aws"]
provider["aws"] (close)
  aws_instance.web
  provider["aws"]
"#,
    );
}

#[test]
fn test_reduction_keeps_reachability() {
    let pruned = build_with(BASIC, &BuildOptions::default().stop_after(StageKind::Prune));
    let full = build(BASIC);

    let close = full.find_named(r#"provider["aws"] (close)"#).unwrap();
    let provider = full.find_named(r#"provider["aws"]"#).unwrap();
    assert!(!full.has_edge(close, provider));
    assert!(full.descendants(close).contains(&provider));
    assert_eq!(full.edge_count(), pruned.edge_count() - 1);

    assert_rendering(
        &full,
        r#"
aws_instance.web
  provider["aws"]
provider["aws"]
provider["aws"] (close)
  aws_instance.web
"#,
    );
    assert_invariants(&full);
}

#[test]
fn test_missing_providers_synthesized_in_own_module() {
    let json = r#"{
        "resources": [{ "type": "aws_instance", "name": "web" }],
        "modules": {
            "sub": { "resources": [{ "type": "foo_instance", "name": "one" }] }
        }
    }"#;
    let graph = build_with(json, &BuildOptions::default().stop_after(StageKind::Wire));
    assert_rendering(
        &graph,
        r#"
aws_instance.web
  provider["aws"]
module.sub.foo_instance.one
  module.sub.provider["foo"]
module.sub.provider["foo"]
provider["aws"]
"#,
    );
    let implicit = graph.find_named(r#"module.sub.provider["foo"]"#).unwrap();
    assert!(graph.vertex(implicit).and_then(|v| v.as_provider()).unwrap().is_implicit());
}

#[test]
fn test_implicit_provider_shared_within_module() {
    let json = r#"{
        "resources": [
            { "type": "aws_instance", "name": "a" },
            { "type": "aws_instance", "name": "b" }
        ]
    }"#;
    let graph = build(json);
    assert_eq!(graph.provider_ids().len(), 1);
    assert_invariants(&graph);
}

#[test]
fn test_grandchild_inherits_root_provider() {
    let json = r#"{
        "providers": [{ "name": "aws" }],
        "modules": {
            "sub": {
                "modules": {
                    "subsub": { "resources": [{ "type": "aws_instance", "name": "one" }] }
                }
            }
        }
    }"#;
    let graph = build(json);
    assert_rendering(
        &graph,
        r#"
module.sub.module.subsub.aws_instance.one
  provider["aws"]
provider["aws"]
provider["aws"] (close)
  module.sub.module.subsub.aws_instance.one
"#,
    );
    assert_invariants(&graph);
}

#[test]
fn test_nested_module_never_inherits_alias() {
    let json = r#"{
        "providers": [
            { "name": "aws" },
            { "name": "aws", "attributes": { "alias": "east" } }
        ],
        "modules": {
            "sub": { "resources": [{ "type": "aws_instance", "name": "web" }] }
        }
    }"#;
    let graph = build(json);
    assert_rendering(
        &graph,
        r#"
module.sub.aws_instance.web
  provider["aws"]
provider["aws"]
provider["aws"] (close)
  module.sub.aws_instance.web
"#,
    );
}

#[test]
fn test_only_alias_in_parent_gives_child_a_default() {
    let json = r#"{
        "providers": [{ "name": "aws", "attributes": { "alias": "east" } }],
        "modules": {
            "sub": { "resources": [{ "type": "aws_instance", "name": "web" }] }
        }
    }"#;
    let graph = build(json);
    assert_rendering(
        &graph,
        r#"
module.sub.aws_instance.web
  module.sub.provider["aws"]
module.sub.provider["aws"]
module.sub.provider["aws"] (close)
  module.sub.aws_instance.web
"#,
    );
}

#[test]
fn test_unused_provider_pruned_with_close() {
    let json = r#"{
        "providers": [{ "name": "aws" }, { "name": "google" }],
        "resources": [{ "type": "aws_instance", "name": "web" }]
    }"#;
    let before = build_with(json, &BuildOptions::default().stop_after(StageKind::Close));
    assert!(before.find_named(r#"provider["google"] (close)"#).is_some());

    let graph = build(json);
    assert!(graph.find_named(r#"provider["google"]"#).is_none());
    assert!(graph.find_named(r#"provider["google"] (close)"#).is_none());
    assert_invariants(&graph);
}

#[test]
fn test_module_call_passes_aliased_provider() {
    let json = r#"{
        "providers": [{ "name": "aws", "attributes": { "alias": "east" } }],
        "modules": {
            "sub": {
                "providerMap": { "aws": "aws.east" },
                "resources": [{ "type": "aws_instance", "name": "web" }]
            }
        }
    }"#;
    let graph = build(json);
    assert_rendering(
        &graph,
        r#"
module.sub.aws_instance.web
  provider["aws"].east
provider["aws"].east
provider["aws"].east (close)
  module.sub.aws_instance.web
"#,
    );
}

#[test]
fn test_passed_default_synthesized_in_parent() {
    let json = r#"{
        "modules": {
            "sub": {
                "providerMap": { "aws": "aws" },
                "resources": [{ "type": "aws_instance", "name": "web" }]
            }
        }
    }"#;
    let graph = build(json);
    assert_rendering(
        &graph,
        r#"
module.sub.aws_instance.web
  provider["aws"]
provider["aws"]
provider["aws"] (close)
  module.sub.aws_instance.web
"#,
    );
    let aws = graph.find_named(r#"provider["aws"]"#).unwrap();
    assert!(graph.vertex(aws).and_then(|v| v.as_provider()).unwrap().is_implicit());
    assert_invariants(&graph);
}

#[test]
fn test_passed_default_independent_of_other_resources() {
    let child_only = r#"{
        "modules": {
            "sub": {
                "providerMap": { "aws": "aws" },
                "resources": [{ "type": "aws_instance", "name": "web" }]
            }
        }
    }"#;
    let with_root = r#"{
        "resources": [{ "type": "aws_instance", "name": "root" }],
        "modules": {
            "sub": {
                "providerMap": { "aws": "aws" },
                "resources": [{ "type": "aws_instance", "name": "web" }]
            }
        }
    }"#;
    let alone = build(child_only);
    let shared = build(with_root);
    assert_eq!(alone.provider_ids().len(), 1);
    assert_eq!(shared.provider_ids().len(), 1);

    let web = shared.find_named("module.sub.aws_instance.web").unwrap();
    let aws = shared.find_named(r#"provider["aws"]"#).unwrap();
    assert!(shared.has_edge(web, aws));
}

#[test]
fn test_passed_alias_missing_in_parent_halts() {
    let json = r#"{
        "modules": {
            "sub": {
                "providerMap": { "aws": "aws.east" },
                "resources": [{ "type": "aws_instance", "name": "web" }]
            }
        }
    }"#;
    let (stage, diags) = halted(try_build(json, None, &BuildOptions::default()).unwrap_err());
    assert_eq!(stage, StageKind::Missing);
    assert_eq!(diags.count_kind(DiagnosticKind::ProviderNotPresent), 1);
}

#[test]
fn test_module_provider_config_wins_over_parent() {
    let json = r#"{
        "providers": [{ "name": "aws" }],
        "resources": [{ "type": "aws_instance", "name": "root" }],
        "modules": {
            "sub": {
                "providers": [{ "name": "aws", "attributes": { "region": "eu-west-1" } }],
                "resources": [{ "type": "aws_instance", "name": "web" }]
            }
        }
    }"#;
    let graph = build_with(json, &BuildOptions::default().stop_after(StageKind::Wire));
    assert_rendering(
        &graph,
        r#"
aws_instance.root
  provider["aws"]
module.sub.aws_instance.web
  module.sub.provider["aws"]
module.sub.provider["aws"]
provider["aws"]
"#,
    );
}

#[test]
fn test_missing_alias_is_not_synthesized() {
    let json = r#"{
        "providers": [{ "name": "aws" }],
        "resources": [{ "type": "aws_instance", "name": "web", "provider": "aws.west" }]
    }"#;
    let (stage, diags) = halted(try_build(json, None, &BuildOptions::default()).unwrap_err());
    assert_eq!(stage, StageKind::Missing);
    assert_eq!(diags.count_kind(DiagnosticKind::ProviderNotPresent), 1);
}

#[test]
fn test_wiring_cycle_halts() {
    let json = r#"{
        "providers": [{
            "name": "aws",
            "attributes": { "region": { "$ref": "aws_instance.web.region" } }
        }],
        "resources": [{ "type": "aws_instance", "name": "web" }]
    }"#;
    let (stage, diags) = halted(try_build(json, None, &BuildOptions::default()).unwrap_err());
    assert_eq!(stage, StageKind::Wire);
    assert!(diags.contains_kind(DiagnosticKind::CycleDetected));
}

#[test]
fn test_provider_depends_on_referenced_data_source() {
    let json = r#"{
        "providers": [
            {
                "name": "aws",
                "attributes": { "token": { "$ref": "data.vault_secret.creds.value" } }
            },
            { "name": "vault" }
        ],
        "resources": [
            { "type": "aws_instance", "name": "web" },
            { "type": "vault_secret", "name": "creds", "mode": "data" }
        ]
    }"#;
    let graph = build(json);
    assert_rendering(
        &graph,
        r#"
aws_instance.web
  provider["aws"]
data.vault_secret.creds
  provider["vault"]
provider["aws"]
  data.vault_secret.creds
provider["aws"] (close)
  aws_instance.web
provider["vault"]
provider["vault"] (close)
  data.vault_secret.creds
"#,
    );
    assert_invariants(&graph);
}

#[test]
fn test_for_each_instances_wired_by_key() {
    let json = r#"{
        "providers": [{ "name": "aws", "attributes": { "for_each": { "b": 2, "a": 1 } } }],
        "resources": [
            { "type": "aws_instance", "name": "x", "provider": "aws.a" },
            { "type": "aws_instance", "name": "y", "provider": "aws.b" }
        ]
    }"#;
    let evaluator = StaticValues::new();
    let output = try_build(json, Some(&evaluator), &BuildOptions::default()).unwrap();
    assert_rendering(
        &output.graph,
        r#"
aws_instance.x
  provider["aws"].a
aws_instance.y
  provider["aws"].b
provider["aws"].a
provider["aws"].a (close)
  aws_instance.x
provider["aws"].b
provider["aws"].b (close)
  aws_instance.y
"#,
    );

    let a = output.graph.find_named(r#"provider["aws"].a"#).unwrap();
    let node = output.graph.vertex(a).and_then(|v| v.as_provider()).unwrap();
    assert_eq!(node.config.as_ref().unwrap().instance_value, Some(Value::Number(1.0)));
}

#[test]
fn test_for_each_from_variable() {
    let json = r#"{
        "providers": [{ "name": "aws", "attributes": { "for_each": { "$ref": "var.regions" } } }],
        "resources": [{ "type": "aws_instance", "name": "x", "provider": "aws.west" }]
    }"#;
    let evaluator = StaticValues::new().with_root(
        "var",
        Value::map([("regions", Value::string_set(["west", "east"]))]),
    );
    let output = try_build(json, Some(&evaluator), &BuildOptions::default()).unwrap();
    // The unused east instance is pruned.
    assert_rendering(
        &output.graph,
        r#"
aws_instance.x
  provider["aws"].west
provider["aws"].west
provider["aws"].west (close)
  aws_instance.x
"#,
    );
}

#[test]
fn test_for_each_without_evaluator_halts() {
    let json = r#"{
        "providers": [{ "name": "aws", "attributes": { "for_each": { "a": 1 } } }],
        "resources": [{ "type": "aws_instance", "name": "x" }]
    }"#;
    let (stage, diags) = halted(try_build(json, None, &BuildOptions::default()).unwrap_err());
    assert_eq!(stage, StageKind::Provider);
    assert!(diags.contains_kind(DiagnosticKind::IterationNotSupported));
}

#[test]
fn test_expansion_failures_collected_per_declaration() {
    let json = r#"{
        "providers": [
            { "name": "aws", "attributes": { "alias": "not valid" } },
            { "name": "google", "attributes": { "alias": { "$ref": "var.name" } } },
            { "name": "azurerm" }
        ]
    }"#;
    let (stage, diags) = halted(try_build(json, None, &BuildOptions::default()).unwrap_err());
    assert_eq!(stage, StageKind::Provider);
    assert_eq!(diags.count_kind(DiagnosticKind::InvalidAlias), 1);
    assert_eq!(diags.count_kind(DiagnosticKind::InvalidExpression), 1);
}

#[test]
fn test_duplicate_provider_config_halts() {
    let json = r#"{
        "providers": [{ "name": "aws" }, { "name": "aws" }],
        "resources": [{ "type": "aws_instance", "name": "web" }]
    }"#;
    let (stage, diags) = halted(try_build(json, None, &BuildOptions::default()).unwrap_err());
    assert_eq!(stage, StageKind::Provider);
    assert_eq!(diags.count_kind(DiagnosticKind::DuplicateProviderConfig), 1);
}

#[test]
fn test_same_provider_in_different_modules_is_not_duplicate() {
    let json = r#"{
        "providers": [{ "name": "aws" }],
        "resources": [{ "type": "aws_instance", "name": "a" }],
        "modules": {
            "sub": {
                "providers": [{ "name": "aws" }],
                "resources": [{ "type": "aws_instance", "name": "b" }]
            }
        }
    }"#;
    let graph = build(json);
    assert_eq!(graph.provider_ids().len(), 2);
    assert_invariants(&graph);
}

#[test]
fn test_rendering_is_deterministic() {
    let json = r#"{
        "providers": [{ "name": "google" }, { "name": "aws" }],
        "resources": [
            { "type": "google_compute_instance", "name": "vm" },
            { "type": "aws_instance", "name": "web" }
        ],
        "modules": {
            "b": { "resources": [{ "type": "aws_s3_bucket", "name": "logs" }] },
            "a": { "resources": [{ "type": "google_storage_bucket", "name": "data" }] }
        }
    }"#;
    let first = build(json).render();
    for _ in 0..5 {
        assert_eq!(build(json).render(), first);
    }
}
