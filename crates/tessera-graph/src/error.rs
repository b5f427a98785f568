//! Library errors for graph construction.
//!
//! [`GraphError`] is a misuse fault (an id that does not belong to the
//! graph). Configuration problems are diagnostics; when they stop the
//! pipeline they are returned inside [`BuildError::Halted`].

use tessera_config::error::Diagnostics;
use thiserror::Error;

use crate::dag::VertexId;
use crate::pipeline::StageKind;

/// Graph result type alias.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised by [`crate::dag::Graph`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The vertex id is not (or no longer) part of the graph.
    #[error("unknown vertex: {0}")]
    UnknownVertex(VertexId),
}

/// Why [`crate::pipeline::build_graph`] produced no graph.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A stage reported error diagnostics.
    #[error("graph construction halted after the {stage} stage:\n{diagnostics}")]
    Halted {
        stage: StageKind,
        /// Every diagnostic collected so far, warnings included
        diagnostics: Diagnostics,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl BuildError {
    /// Diagnostics of a halted build, empty for graph faults.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            BuildError::Halted { diagnostics, .. } => Some(diagnostics),
            BuildError::Graph(_) => None,
        }
    }
}
