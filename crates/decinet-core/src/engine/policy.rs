//! # Decision Policies
//!
//! Backward induction over the decisions of an influence diagram.
//!
//! Decisions are ordered so each one follows the decisions it observes.
//! Utilities are summed once. Each decision, last first, then gets:
//!
//! 1. a scratch copy of the working set reduced to what that decision
//!    needs, and the relevant factors of it multiplied into one table over
//!    the decision and its surviving parents;
//! 2. the argmax [`algebra::policy`] of that table, with any unobserved
//!    decision axis the rule does not vary along dropped;
//! 3. the policy inserted into the real working set, and the decision
//!    relabeled as a chance node so earlier decisions see its action as a
//!    known conditional distribution.
//!
//! The real working set is never reduced, so the parents of decisions still
//! waiting to be resolved survive until their own turn.

use crate::engine::algebra;
use crate::engine::elimination::Eliminator;
use crate::engine::errors::InferenceError;
use crate::engine::factor::Factor;
use crate::engine::registry::Variable;

/// Outcome of solving one decision.
#[derive(Debug, Clone)]
pub struct ResolvedDecision {
    pub decision: Variable,
    /// Unnormalized product of the relevant factors the policy was derived
    /// from. Utilities are weighted only by the probabilities folded in
    /// while reducing the model.
    pub combined: Factor,
    /// Optimal decision rule, decision on the last axis.
    pub policy: Factor,
}

impl<'r> Eliminator<'r> {
    /// Resolves every decision by backward induction.
    ///
    /// Returns one entry per decision in forward decision order. Fails with
    /// [`InferenceError::NoSolution`] when a decision has no relevant factor.
    /// Decisions need not observe each other: a rule that turns out not to
    /// depend on an unobserved decision loses that axis.
    pub fn solve_policies(&mut self) -> Result<Vec<ResolvedDecision>, InferenceError> {
        let order = self.decision_order.clone();
        if order.is_empty() {
            return Ok(Vec::new());
        }

        self.sum_utilities()?;

        let mut resolved = Vec::with_capacity(order.len());
        for decision in order.iter().rev() {
            let (combined, policy) = self.decide(decision)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "resolved decision {} over {} axes ({} states)",
                decision,
                policy.variables().len(),
                policy.len() / decision.arity()
            );

            self.insert(policy.clone());
            self.registry.relabel_as_chance(decision)?;
            resolved.push(ResolvedDecision {
                decision: *decision,
                combined,
                policy,
            });
        }

        resolved.reverse();
        Ok(resolved)
    }

    /// Derives the combined table and rule for `decision` from a scratch
    /// copy of the working set, which is restored afterwards.
    fn decide(&mut self, decision: &Variable) -> Result<(Factor, Factor), InferenceError> {
        let saved_pool = self.pool.clone();
        let saved_eliminated = self.eliminated.clone();
        let outcome = self.decide_in_scratch(decision);
        self.pool = saved_pool;
        self.eliminated = saved_eliminated;
        outcome
    }

    fn decide_in_scratch(
        &mut self,
        decision: &Variable,
    ) -> Result<(Factor, Factor), InferenceError> {
        self.eliminate_hidden(&[], &[], true)?;
        let candidates = self.relevant_factors(decision)?;
        let combined = if candidates.len() == 1 {
            candidates.into_iter().next().ok_or_else(|| {
                InferenceError::Internal("candidate list emptied unexpectedly".into())
            })?
        } else {
            let refs: Vec<&Factor> = candidates.iter().collect();
            algebra::product(self.registry, &refs)?
        };
        let policy = algebra::policy(self.registry, &combined, decision)?;
        self.drop_unobserved_axes(decision, combined, policy)
    }

    /// Removes axes outside the decision's information set along which the
    /// rule is constant. Both tables are taken at the first outcome of a
    /// removed axis. Axes the rule does vary along are kept.
    fn drop_unobserved_axes(
        &mut self,
        decision: &Variable,
        mut combined: Factor,
        mut policy: Factor,
    ) -> Result<(Factor, Factor), InferenceError> {
        let parents: Vec<Variable> = self.dependencies.parents(decision).to_vec();
        let unobserved: Vec<Variable> = policy
            .variables()
            .iter()
            .filter(|v| **v != *decision && !parents.contains(*v))
            .copied()
            .collect();
        for axis in &unobserved {
            let first = algebra::restrict(self.registry, &policy, axis, 0)?;
            let mut constant = true;
            for outcome in 1..axis.arity() {
                let other = algebra::restrict(self.registry, &policy, axis, outcome)?;
                if other.data() != first.data() {
                    constant = false;
                    break;
                }
            }
            if constant {
                #[cfg(feature = "tracing")]
                tracing::trace!("rule for {} ignores unobserved {}", decision, axis);
                combined = algebra::restrict(self.registry, &combined, axis, 0)?;
                policy = first;
            }
        }
        Ok((combined, policy))
    }

    /// Removes and returns the working factors a decision's policy is
    /// derived from.
    ///
    /// A decision without informational parents takes every factor that
    /// mentions it. Otherwise it takes factors mentioning it together with at
    /// least one declared parent, plus factors over the decision alone.
    fn relevant_factors(&mut self, decision: &Variable) -> Result<Vec<Factor>, InferenceError> {
        let parents: Vec<Variable> = self.dependencies.parents(decision).to_vec();
        let candidates = if parents.is_empty() {
            self.take_where(|f| f.contains(decision))
        } else {
            self.take_where(|f| {
                f.contains(decision)
                    && (f.variables().len() == 1
                        || f.variables().iter().any(|v| parents.contains(v)))
            })
        };
        if candidates.is_empty() {
            return Err(InferenceError::NoSolution(format!(
                "decision {} has no relevant factor",
                decision
            )));
        }
        Ok(candidates)
    }
}
