//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::Runtime`].
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Seed for `randomUniform` fills. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Check operand shapes while tracing, so shape errors surface from
    /// `apply` rather than from `execute`.
    pub validate_on_trace: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: None,
            validate_on_trace: true,
        }
    }
}

impl RuntimeConfig {
    /// Use a fixed random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable trace-time shape checks.
    pub fn with_validate_on_trace(mut self, validate: bool) -> Self {
        self.validate_on_trace = validate;
        self
    }
}
