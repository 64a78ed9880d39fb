use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Error;

/// Budgets for a single proof attempt.
/// Saturation is not guaranteed to terminate, so running out of budget is a normal outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    // How many rule applications one assertion may use.
    pub max_steps: usize,

    // How many case splits one assertion may use.
    pub max_splits: usize,

    // The deepest term that quantifier instantiation will substitute.
    pub max_instantiation_depth: usize,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            max_splits: 256,
            max_instantiation_depth: 6,
        }
    }
}

impl ProverConfig {
    /// Reads a configuration from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<ProverConfig, Error> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
