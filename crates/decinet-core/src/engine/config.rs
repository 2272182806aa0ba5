//! Solver configuration.

use crate::engine::errors::InferenceError;
use crate::engine::ordering::EliminationHeuristic;

/// Options applied when a network is compiled and solved.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    /// Strategy used to order hidden variables.
    pub heuristic: EliminationHeuristic,
    /// Rescale every chance table so each parent combination sums to one.
    /// Lets raw counts or unnormalized tables be used directly.
    pub normalize_chance_tables: bool,
    /// Scalar weight applied to individual utility terms before they are
    /// summed, by utility variable name. Unlisted terms have weight 1.
    pub utility_weights: Vec<(String, f64)>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            heuristic: EliminationHeuristic::MinDegree,
            normalize_chance_tables: true,
            utility_weights: Vec::new(),
        }
    }
}

impl SolverConfig {
    pub fn with_heuristic(mut self, heuristic: EliminationHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_utility_weight(mut self, utility: impl Into<String>, weight: f64) -> Self {
        self.utility_weights.push((utility.into(), weight));
        self
    }

    pub(crate) fn validate(self) -> Result<Self, InferenceError> {
        for (i, (name, weight)) in self.utility_weights.iter().enumerate() {
            if !weight.is_finite() {
                return Err(InferenceError::Numerical(format!(
                    "utility weight for '{}' must be finite, got {}",
                    name, weight
                )));
            }
            if self.utility_weights[..i].iter().any(|(n, _)| n == name) {
                return Err(InferenceError::ValidationError(format!(
                    "utility weight for '{}' given more than once",
                    name
                )));
            }
        }
        Ok(self)
    }
}
