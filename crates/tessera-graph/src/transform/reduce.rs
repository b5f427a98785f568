use tessera_config::error::Diagnostics;
use tracing::debug;

use super::StageInput;
use crate::error::Result;
use crate::vertex::ProviderGraph;

/// Drop every edge implied by a longer path.
pub fn reduce(graph: &mut ProviderGraph, _input: &StageInput<'_>) -> Result<Diagnostics> {
    let removed = graph.transitive_reduction();
    debug!(removed, "transitive reduction");
    Ok(Diagnostics::new())
}
