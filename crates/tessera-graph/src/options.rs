//! Pipeline options.
//!
//! Options are plain serde data, loadable from JSON:
//!
//! ```json
//! { "stopAfter": "prune", "verifyAcyclic": true }
//! ```
//!
//! Every field has a default, so `{}` is a valid options document.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::StageKind;

/// Errors that can occur when loading options.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// Failed to read the options file.
    #[error("failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the options JSON.
    #[error("failed to parse options JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for options loading.
pub type OptionsResult<T> = Result<T, OptionsError>;

/// How [`crate::pipeline::build_graph`] runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Last stage to run; every stage runs when None
    pub stop_after: Option<StageKind>,
    /// Check the graph for cycles after every stage
    pub verify_acyclic: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            stop_after: None,
            verify_acyclic: true,
        }
    }
}

impl BuildOptions {
    /// Stop after `stage`.
    pub fn stop_after(mut self, stage: StageKind) -> Self {
        self.stop_after = Some(stage);
        self
    }

    /// Parse options from a JSON string.
    pub fn from_json_str(json: &str) -> OptionsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> OptionsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BuildOptions::from_json_str("{}").unwrap();
        assert_eq!(options, BuildOptions::default());
        assert!(options.verify_acyclic);
        assert_eq!(options.stop_after, None);
    }

    #[test]
    fn test_camel_case_fields() {
        let options =
            BuildOptions::from_json_str(r#"{"stopAfter": "prune", "verifyAcyclic": false}"#)
                .unwrap();
        assert_eq!(options.stop_after, Some(StageKind::Prune));
        assert!(!options.verify_acyclic);
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let err = BuildOptions::from_json_str(r#"{"stopAfter": "apply"}"#).unwrap_err();
        assert!(matches!(err, OptionsError::Json(_)));
    }
}
