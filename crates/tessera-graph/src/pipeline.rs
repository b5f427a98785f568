//! Graph construction pipeline.
//!
//! The pipeline is a fixed list of stages run in order over one graph:
//!
//! ```text
//! resource -> provider -> missing -> wire -> close -> prune -> reduce -> ready
//! ```
//!
//! After each stage the orchestrator merges the stage's diagnostics, halts
//! on any error, and (unless disabled) checks the graph is still acyclic.
//! Warnings accumulate and are returned with the finished graph.
//! [`BuildOptions::stop_after`] ends the run early; it never reorders stages.
//!
//! # Examples
//!
//! ```
//! # use tessera_config::module::Config;
//! # use tessera_graph::pipeline::build_graph;
//! # use tessera_graph::options::BuildOptions;
//! let json = r#"{
//!     "providers": [{ "name": "aws" }],
//!     "resources": [{ "type": "aws_instance", "name": "web" }]
//! }"#;
//! let (config, _) = Config::from_fixture_json(json).unwrap();
//! let output = build_graph(&config, None, &BuildOptions::default()).unwrap();
//! assert_eq!(
//!     output.graph.render(),
//!     "aws_instance.web\n  provider[\"aws\"]\nprovider[\"aws\"]\nprovider[\"aws\"] (close)\n  aws_instance.web"
//! );
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_config::error::{Diagnostic, DiagnosticKind, Diagnostics};
use tessera_config::eval::StaticEvaluator;
use tessera_config::module::Config;
use tracing::{debug, instrument, warn};

use crate::dag::GraphVertex;
use crate::error::{BuildError, Result};
use crate::options::BuildOptions;
use crate::transform::{
    StageInput, add_close_providers, add_missing_providers, add_providers, add_resources,
    prune_providers, reduce, wire_providers,
};
use crate::vertex::ProviderGraph;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Resource,
    Provider,
    Missing,
    Wire,
    Close,
    Prune,
    Reduce,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Resource => "resource",
            StageKind::Provider => "provider",
            StageKind::Missing => "missing",
            StageKind::Wire => "wire",
            StageKind::Close => "close",
            StageKind::Prune => "prune",
            StageKind::Reduce => "reduce",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signature shared by every stage.
pub type StageFn = fn(&mut ProviderGraph, &StageInput<'_>) -> Result<Diagnostics>;

/// One pipeline entry.
pub struct Stage {
    pub kind: StageKind,
    pub run: StageFn,
}

/// The pipeline, in order.
pub const STAGES: &[Stage] = &[
    Stage { kind: StageKind::Resource, run: add_resources },
    Stage { kind: StageKind::Provider, run: add_providers },
    Stage { kind: StageKind::Missing, run: add_missing_providers },
    Stage { kind: StageKind::Wire, run: wire_providers },
    Stage { kind: StageKind::Close, run: add_close_providers },
    Stage { kind: StageKind::Prune, run: prune_providers },
    Stage { kind: StageKind::Reduce, run: reduce },
];

/// A finished (or deliberately stopped) graph.
#[derive(Debug)]
pub struct BuildOutput {
    pub graph: ProviderGraph,
    /// Warnings collected along the way
    pub diagnostics: Diagnostics,
    /// Stages that ran, in order
    pub completed: Vec<StageKind>,
}

/// Build the provider graph for `config`.
///
/// `evaluator` enables `alias` references and `for_each` on provider
/// declarations.
///
/// # Errors
///
/// [`BuildError::Halted`] when a stage reports errors or leaves a cycle
/// behind, [`BuildError::Graph`] on internal graph misuse.
#[instrument(skip_all, fields(modules = config.len()))]
pub fn build_graph(
    config: &Config,
    evaluator: Option<&dyn StaticEvaluator>,
    options: &BuildOptions,
) -> std::result::Result<BuildOutput, BuildError> {
    let input = StageInput { config, evaluator };
    let mut graph = ProviderGraph::new();
    let mut diagnostics = Diagnostics::new();
    let mut completed = Vec::new();

    for stage in STAGES {
        let mut stage_diags = (stage.run)(&mut graph, &input)?;
        diagnostics.append(&mut stage_diags);

        if !diagnostics.has_errors() && options.verify_acyclic {
            diagnostics.extend(cycle_diagnostics(&graph, stage.kind));
        }

        debug!(
            stage = %stage.kind,
            vertices = graph.len(),
            edges = graph.edge_count(),
            "stage complete"
        );

        if diagnostics.has_errors() {
            warn!(
                stage = %stage.kind,
                errors = diagnostics.errors().count(),
                "halting graph construction"
            );
            return Err(BuildError::Halted {
                stage: stage.kind,
                diagnostics,
            });
        }

        completed.push(stage.kind);
        if options.stop_after == Some(stage.kind) {
            debug!(stage = %stage.kind, "stopping early");
            break;
        }
    }

    Ok(BuildOutput {
        graph,
        diagnostics,
        completed,
    })
}

fn cycle_diagnostics(graph: &ProviderGraph, stage: StageKind) -> Vec<Diagnostic> {
    graph
        .cycles()
        .into_iter()
        .map(|cycle| {
            let names = cycle
                .iter()
                .filter_map(|id| graph.vertex(*id).map(GraphVertex::name))
                .collect::<Vec<_>>()
                .join(", ");
            Diagnostic::error(
                DiagnosticKind::CycleDetected,
                "Cycle detected",
                format!("The {stage} stage left a dependency cycle between: {names}."),
            )
        })
        .collect()
}
