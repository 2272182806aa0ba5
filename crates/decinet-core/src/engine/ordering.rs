//! Elimination-order heuristics.
//!
//! The order in which hidden variables are summed out changes the size of
//! the intermediate factors but never the answer. Finding an order of
//! minimum width is NP-hard, so the engine uses a greedy, static heuristic
//! chosen up front for each elimination pass. The heuristic is a plain enum
//! so callers can swap it through [`crate::engine::config::SolverConfig`].

use rustc_hash::FxHashSet;

use crate::engine::factor::Factor;
use crate::engine::registry::Variable;

/// Strategy used to order hidden variables before elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EliminationHeuristic {
    /// Ascending induced degree: the number of distinct variables across all
    /// factors mentioning the candidate. Ties go to the lower identity.
    #[default]
    MinDegree,
    /// Ascending variable identity (declaration order for compiled networks).
    Declaration,
}

impl EliminationHeuristic {
    /// Orders `hidden` given the current working factors.
    ///
    /// Deterministic: identical inputs always produce the same order.
    pub fn order<'a>(
        self,
        mut hidden: Vec<Variable>,
        factors: impl Iterator<Item = &'a Factor> + Clone,
    ) -> Vec<Variable> {
        hidden.sort();
        match self {
            EliminationHeuristic::Declaration => hidden,
            EliminationHeuristic::MinDegree => {
                // Stable sort by identity above, then a stable sort by degree.
                hidden.sort_by_cached_key(|v| induced_degree(v, factors.clone()));
                hidden
            }
        }
    }
}

/// Number of distinct variables appearing in factors that mention `variable`.
pub fn induced_degree<'a>(variable: &Variable, factors: impl Iterator<Item = &'a Factor>) -> usize {
    let mut neighbours = FxHashSet::default();
    for factor in factors.filter(|f| f.contains(variable)) {
        neighbours.extend(factor.variables().iter().map(Variable::id));
    }
    neighbours.len()
}
