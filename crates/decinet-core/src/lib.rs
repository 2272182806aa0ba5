//! # Decinet Core
//!
//! Exact inference and optimal decisions for discrete Bayesian networks and
//! influence diagrams, by variable elimination over flat factor tables.

pub mod engine;
pub mod network;

// Re-export commonly used types
pub use engine::algebra::{invert, marginal, normalize};
pub use engine::config::SolverConfig;
pub use engine::elimination::{Eliminator, Evidence, SolveTarget};
pub use engine::errors::InferenceError;
pub use engine::factor::Factor;
pub use engine::ordering::EliminationHeuristic;
pub use engine::registry::{NodeKind, Registry, Variable, VariableId};
pub use network::definition::{FactorDef, NetworkDef, VariableDef};
pub use network::{DecisionPolicy, Network, UtilityResult};

/// Compile a network definition with the default solver configuration.
pub fn compile(def: NetworkDef) -> Result<Network, InferenceError> {
    Network::new(def)
}
