//! # Variable Elimination
//!
//! The [`Eliminator`] owns a working set of factors for one solve and
//! shrinks it step by step:
//!
//! 1. evidence restricts every factor mentioning an observed variable;
//! 2. utility factors are dropped (probability queries), isolated (one
//!    utility term), or summed into a single additive utility factor;
//! 3. hidden chance variables are eliminated in heuristic order, each by
//!    multiplying the factors that mention it and summing it out;
//! 4. what remains is multiplied into the answer.
//!
//! The working set is an arena keyed by [`FactorId`]. Iteration follows
//! creation order, which keeps every result deterministic. The registry is
//! borrowed for the lifetime of the eliminator, so one solve cannot observe
//! another's relabeled decisions.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::engine::algebra;
use crate::engine::dependencies::DependencyMap;
use crate::engine::errors::InferenceError;
use crate::engine::factor::Factor;
use crate::engine::ordering::EliminationHeuristic;
use crate::engine::registry::{FactorId, NodeKind, Registry, Variable, VariableId};

/// An observed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evidence {
    pub variable: Variable,
    pub outcome: usize,
}

impl Evidence {
    pub fn new(variable: Variable, outcome: usize) -> Self {
        Self { variable, outcome }
    }
}

/// What a [`Eliminator::solve`] call computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveTarget {
    /// Joint probability of the query variables and the evidence.
    Probability,
    /// Probability-weighted sum of every utility term.
    TotalUtility,
    /// Probability-weighted value of a single utility term.
    UtilityTerm(Variable),
}

/// Working state of one elimination run.
#[derive(Debug)]
pub struct Eliminator<'r> {
    pub(crate) registry: &'r mut Registry,
    pub(crate) pool: BTreeMap<FactorId, Factor>,
    pub(crate) eliminated: FxHashSet<VariableId>,
    pub(crate) dependencies: DependencyMap,
    pub(crate) decision_order: Vec<Variable>,
    utility_weights: FxHashMap<VariableId, f64>,
    heuristic: EliminationHeuristic,
}

impl<'r> Eliminator<'r> {
    /// Seeds the working set with `factors`.
    ///
    /// Fails with [`InferenceError::CyclicGraph`] if the decisions in
    /// `dependencies` cannot be ordered.
    pub fn new(
        registry: &'r mut Registry,
        factors: impl IntoIterator<Item = Factor>,
        dependencies: DependencyMap,
    ) -> Result<Self, InferenceError> {
        let decision_order = dependencies.decision_order()?;
        Ok(Self {
            registry,
            pool: factors.into_iter().map(|f| (f.id(), f)).collect(),
            eliminated: FxHashSet::default(),
            dependencies,
            decision_order,
            utility_weights: FxHashMap::default(),
            heuristic: EliminationHeuristic::default(),
        })
    }

    pub fn with_heuristic(mut self, heuristic: EliminationHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Scalar weights applied to utility terms by [`Eliminator::sum_utilities`].
    pub fn with_utility_weights(mut self, weights: FxHashMap<VariableId, f64>) -> Self {
        self.utility_weights = weights;
        self
    }

    /// Current working factors in creation order.
    pub fn factors(&self) -> impl Iterator<Item = &Factor> + Clone + '_ {
        self.pool.values()
    }

    pub fn is_eliminated(&self, variable: &Variable) -> bool {
        self.eliminated.contains(&variable.id())
    }

    pub fn registry(&self) -> &Registry {
        &*self.registry
    }

    pub(crate) fn insert(&mut self, factor: Factor) {
        self.pool.insert(factor.id(), factor);
    }

    /// Removes and returns every working factor matching `keep`.
    pub(crate) fn take_where(&mut self, mut keep: impl FnMut(&Factor) -> bool) -> Vec<Factor> {
        let ids: Vec<FactorId> = self
            .pool
            .values()
            .filter(|f| keep(f))
            .map(Factor::id)
            .collect();
        ids.iter().filter_map(|id| self.pool.remove(id)).collect()
    }

    fn mentions_utility(&self, factor: &Factor) -> bool {
        factor
            .variables()
            .iter()
            .any(|v| self.registry.kind_of(v) == NodeKind::Utility)
    }

    /// Restricts every factor mentioning an observed variable to its outcome.
    pub fn eliminate_evidence(&mut self, evidence: &[Evidence]) -> Result<(), InferenceError> {
        for observed in evidence {
            let touched = self.take_where(|f| f.contains(&observed.variable));
            for factor in &touched {
                let restricted =
                    algebra::restrict(self.registry, factor, &observed.variable, observed.outcome)?;
                self.insert(restricted);
            }
        }
        Ok(())
    }

    /// Drops every factor mentioning a utility variable other than `except`.
    pub fn remove_utilities(&mut self, except: Option<&Variable>) {
        let registry = &*self.registry;
        let ids: Vec<FactorId> = self
            .pool
            .values()
            .filter(|f| {
                let utilities: Vec<&Variable> = f
                    .variables()
                    .iter()
                    .filter(|v| registry.kind_of(v) == NodeKind::Utility)
                    .collect();
                match except {
                    Some(keep) => !utilities.is_empty() && !utilities.contains(&keep),
                    None => !utilities.is_empty(),
                }
            })
            .map(Factor::id)
            .collect();
        for id in ids {
            self.pool.remove(&id);
        }
    }

    /// Replaces all utility factors by their (weighted) sum with every
    /// utility variable summed out.
    pub fn sum_utilities(&mut self) -> Result<(), InferenceError> {
        let utility_factors = {
            let registry = &*self.registry;
            let ids: Vec<FactorId> = self
                .pool
                .values()
                .filter(|f| {
                    f.variables()
                        .iter()
                        .any(|v| registry.kind_of(v) == NodeKind::Utility)
                })
                .map(Factor::id)
                .collect();
            ids.iter()
                .filter_map(|id| self.pool.remove(id))
                .collect::<Vec<_>>()
        };
        if utility_factors.is_empty() {
            return Ok(());
        }

        let mut terms = Vec::with_capacity(utility_factors.len());
        for factor in utility_factors {
            let weight: f64 = factor
                .variables()
                .iter()
                .filter_map(|v| self.utility_weights.get(&v.id()))
                .product();
            if weight == 1.0 {
                terms.push(factor);
            } else {
                terms.push(algebra::scale(self.registry, &factor, weight)?);
            }
        }
        let refs: Vec<&Factor> = terms.iter().collect();
        let mut combined = algebra::sum(self.registry, &refs)?;

        let utilities: Vec<Variable> = combined
            .variables()
            .iter()
            .filter(|v| self.registry.kind_of(v) == NodeKind::Utility)
            .copied()
            .collect();
        for utility in &utilities {
            combined = algebra::sum_out(self.registry, &combined, utility)?;
            self.eliminated.insert(utility.id());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "summed {} utility terms into a factor over {} axes",
            terms.len(),
            combined.variables().len()
        );

        self.insert(combined);
        Ok(())
    }

    /// Decisions that have not been resolved yet, in decision order.
    fn undecided(&self) -> Vec<Variable> {
        self.decision_order
            .iter()
            .filter(|d| self.registry.kind_of(d) == NodeKind::Decision)
            .copied()
            .collect()
    }

    /// Parents that must survive elimination: those of the last undecided
    /// decision only, or of every undecided decision.
    fn required_parents(&self, single_decision: bool) -> FxHashSet<VariableId> {
        let undecided = self.undecided();
        let scoped: &[Variable] = match (single_decision, undecided.last()) {
            (true, Some(_)) => &undecided[undecided.len() - 1..],
            _ => &undecided,
        };
        scoped
            .iter()
            .flat_map(|d| self.dependencies.parents(d).iter().map(Variable::id))
            .collect()
    }

    /// Chance variables in the working set that may be eliminated.
    pub fn hidden_variables(
        &self,
        evidence: &[Evidence],
        query: &[Variable],
        single_decision: bool,
    ) -> Vec<Variable> {
        let required = self.required_parents(single_decision);
        let mut seen = FxHashSet::default();
        let mut hidden = Vec::new();
        for var in self.pool.values().flat_map(|f| f.variables().iter()) {
            if !seen.insert(var.id()) {
                continue;
            }
            let is_hidden = self.registry.kind_of(var) == NodeKind::Chance
                && !self.eliminated.contains(&var.id())
                && !evidence.iter().any(|e| e.variable == *var)
                && !query.contains(var)
                && !required.contains(&var.id());
            if is_hidden {
                hidden.push(*var);
            }
        }
        hidden
    }

    /// Eliminates every hidden variable in heuristic order.
    pub fn eliminate_hidden(
        &mut self,
        evidence: &[Evidence],
        query: &[Variable],
        single_decision: bool,
    ) -> Result<(), InferenceError> {
        let hidden = self.hidden_variables(evidence, query, single_decision);
        let order = self.heuristic.order(hidden, self.pool.values());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "eliminating {} hidden variables: {:?}",
            order.len(),
            order.iter().map(|v| v.id().0).collect::<Vec<_>>()
        );

        for variable in &order {
            self.eliminate_variable(variable)?;
        }
        Ok(())
    }

    /// Multiplies the factors mentioning `variable`, sums it out, and puts
    /// the result back.
    pub fn eliminate_variable(&mut self, variable: &Variable) -> Result<(), InferenceError> {
        let touched = self.take_where(|f| f.contains(variable));
        self.eliminated.insert(variable.id());
        if touched.is_empty() {
            return Ok(());
        }
        let refs: Vec<&Factor> = touched.iter().collect();
        let joint = algebra::product(self.registry, &refs)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(
            "eliminating {} from {} factors ({} cells)",
            variable,
            touched.len(),
            joint.len()
        );

        let reduced = algebra::sum_out(self.registry, &joint, variable)?;
        self.insert(reduced);
        Ok(())
    }

    /// Multiplies every working factor into one, which replaces the pool.
    pub fn collapse(&mut self) -> Result<Factor, InferenceError> {
        let remaining = std::mem::take(&mut self.pool);
        let refs: Vec<&Factor> = remaining.values().collect();
        let result = algebra::product(self.registry, &refs)?;
        self.insert(result.clone());
        Ok(result)
    }

    /// Runs a full query: evidence, utility handling, hidden elimination and
    /// the final product.
    pub fn solve(
        &mut self,
        evidence: &[Evidence],
        query: &[Variable],
        target: SolveTarget,
    ) -> Result<Factor, InferenceError> {
        self.eliminate_evidence(evidence)?;
        match target {
            SolveTarget::Probability => self.remove_utilities(None),
            SolveTarget::TotalUtility => self.sum_utilities()?,
            SolveTarget::UtilityTerm(utility) => self.remove_utilities(Some(&utility)),
        }
        self.eliminate_hidden(evidence, query, false)?;
        self.collapse()
    }

    pub(crate) fn has_utilities(&self) -> bool {
        self.pool.values().any(|f| self.mentions_utility(f))
    }
}
