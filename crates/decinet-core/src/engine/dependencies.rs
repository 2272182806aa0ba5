//! Informational parents of decisions.

use std::collections::VecDeque;

use crate::engine::errors::InferenceError;
use crate::engine::registry::Variable;

/// For each decision, the variables observed before it is made.
///
/// Insertion order is remembered and used to break ties when decisions are
/// ordered, so independent decisions keep a stable relative order.
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    entries: Vec<(Variable, Vec<Variable>)>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `parents` for `decision`, replacing an earlier entry.
    pub fn insert(&mut self, decision: Variable, parents: Vec<Variable>) {
        match self.entries.iter_mut().find(|(d, _)| *d == decision) {
            Some(entry) => entry.1 = parents,
            None => self.entries.push((decision, parents)),
        }
    }

    /// Declared parents of `decision` (empty if unknown).
    pub fn parents(&self, decision: &Variable) -> &[Variable] {
        self.entries
            .iter()
            .find(|(d, _)| d == decision)
            .map(|(_, p)| p.as_slice())
            .unwrap_or(&[])
    }

    /// Decisions in insertion order.
    pub fn decisions(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.entries.iter().map(|(d, _)| d)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decisions ordered so that every decision comes after the decisions it
    /// lists as parents.
    pub fn decision_order(&self) -> Result<Vec<Variable>, InferenceError> {
        let n = self.entries.len();
        let mut pending: Vec<usize> = vec![0; n];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (child, (_, parents)) in self.entries.iter().enumerate() {
            for parent in parents {
                if let Some(p) = self.entries.iter().position(|(d, _)| d == parent) {
                    pending[child] += 1;
                    children[p].push(child);
                }
            }
        }

        let mut ready: VecDeque<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(next) = ready.pop_front() {
            order.push(self.entries[next].0);
            let mut unlocked = Vec::new();
            for &child in &children[next] {
                pending[child] -= 1;
                if pending[child] == 0 {
                    unlocked.push(child);
                }
            }
            unlocked.sort_unstable();
            ready.extend(unlocked);
        }

        if order.len() != n {
            return Err(InferenceError::CyclicGraph);
        }
        Ok(order)
    }
}
