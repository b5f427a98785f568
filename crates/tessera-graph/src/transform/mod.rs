//! Graph transforms.
//!
//! Each transform is a plain function over the graph under construction:
//!
//! | Transform | Function | Effect |
//! |---|---|---|
//! | resource | [`add_resources`] | one vertex per resource |
//! | provider | [`add_providers`] | one vertex per provider instance |
//! | missing | [`add_missing_providers`] | implicit default providers |
//! | wire | [`wire_providers`] | resource -> provider edges |
//! | close | [`add_close_providers`] | teardown vertices |
//! | prune | [`prune_providers`] | drop unused providers |
//! | reduce | [`reduce`] | transitive reduction |
//!
//! Configuration problems come back as diagnostics; `Err` is reserved for
//! graph misuse.

mod config;
mod provider;
mod reduce;

use tessera_config::eval::StaticEvaluator;
use tessera_config::module::Config;

pub use config::add_resources;
pub use provider::{
    add_close_providers, add_missing_providers, add_providers, prune_providers, wire_providers,
};
pub use reduce::reduce;

/// Read-only inputs shared by every transform.
#[derive(Clone, Copy)]
pub struct StageInput<'a> {
    pub config: &'a Config,
    /// Static evaluator for provider `alias` and `for_each`, if any
    pub evaluator: Option<&'a dyn StaticEvaluator>,
}

impl<'a> StageInput<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config, evaluator: None }
    }

    pub fn with_evaluator(mut self, evaluator: &'a dyn StaticEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }
}
