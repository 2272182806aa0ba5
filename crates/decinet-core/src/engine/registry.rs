//! # Variable Registry
//!
//! Issues [`Variable`] handles and constructs validated [`Factor`]s.
//!
//! The registry is an explicit value owned by whoever compiles a network. It
//! holds the two counters the engine relies on (variable identities and
//! factor creation ids) and the authoritative node kind of every variable.
//! Cloning a registry is cheap and gives an independent solve context.
//!
//! ## Identity
//!
//! Variables compare, hash and order by [`VariableId`] only. A handle also
//! records its arity and the kind it was declared with; when a decision is
//! relabeled as a chance node the registry is updated and [`Registry::kind_of`]
//! reports the new kind, while handles already copied into factors keep
//! comparing equal.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use rustc_hash::FxHashMap;

use crate::engine::errors::InferenceError;
use crate::engine::factor::{cell_count, Axes, Factor};

/// A unique identifier for a variable. Assigned once, never reused.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableId(pub u32);

/// Creation id of a factor. Monotonically increasing per registry.
///
/// Only used to track membership in the elimination engine's working set,
/// never to compare factor contents.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct FactorId(pub u64);

/// The role a variable plays in an influence diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NodeKind {
    /// Random variable with a conditional probability table.
    Chance,
    /// Action chosen by the decision maker after observing its parents.
    Decision,
    /// Additive utility term. Always has a single outcome.
    Utility,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Chance => "chance",
            NodeKind::Decision => "decision",
            NodeKind::Utility => "utility",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chance" => Ok(NodeKind::Chance),
            "decision" => Ok(NodeKind::Decision),
            "utility" => Ok(NodeKind::Utility),
            _ => Err(InferenceError::UnsupportedKind(s.to_string())),
        }
    }
}

/// An immutable handle to a discrete variable.
#[derive(Debug, Clone, Copy)]
pub struct Variable {
    id: VariableId,
    arity: usize,
    kind: NodeKind,
}

impl Variable {
    pub fn id(&self) -> VariableId {
        self.id
    }

    /// Number of outcomes (always >= 1).
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Kind recorded on this handle. The engine consults
    /// [`Registry::kind_of`] instead, which tracks relabeling.
    pub fn declared_kind(&self) -> NodeKind {
        self.kind
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.id.0)
    }
}

/// Owner of variable identities, node kinds and the factor-id counter.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    variables: FxHashMap<VariableId, Variable>,
    next_variable: u32,
    next_factor: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable with the next free sequential identity.
    pub fn add_variable(&mut self, kind: NodeKind, arity: usize) -> Result<Variable, InferenceError> {
        while self.variables.contains_key(&VariableId(self.next_variable)) {
            self.next_variable += 1;
        }
        self.add_variable_with_id(VariableId(self.next_variable), kind, arity)
    }

    /// Adds a variable with a caller-supplied identity.
    ///
    /// Fails with [`InferenceError::DuplicateVariable`] if the identity is taken.
    pub fn add_variable_with_id(
        &mut self,
        id: VariableId,
        kind: NodeKind,
        arity: usize,
    ) -> Result<Variable, InferenceError> {
        if self.variables.contains_key(&id) {
            return Err(InferenceError::DuplicateVariable(format!("#{}", id.0)));
        }
        if arity == 0 {
            return Err(InferenceError::ValidationError(format!(
                "variable #{} must have at least one outcome",
                id.0
            )));
        }
        let variable = Variable { id, arity, kind };
        self.variables.insert(id, variable);
        self.next_variable = self.next_variable.max(id.0.saturating_add(1));
        Ok(variable)
    }

    /// Returns the current handle for `id`, reflecting any relabeling.
    pub fn variable(&self, id: VariableId) -> Option<Variable> {
        self.variables.get(&id).copied()
    }

    /// All registered variables, ordered by identity.
    pub fn variables(&self) -> Vec<Variable> {
        let mut all: Vec<Variable> = self.variables.values().copied().collect();
        all.sort_unstable();
        all
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Current node kind of `variable`.
    ///
    /// Falls back to the handle's declared kind for variables issued by a
    /// different registry.
    pub fn kind_of(&self, variable: &Variable) -> NodeKind {
        self.variables
            .get(&variable.id)
            .map(|v| v.kind)
            .unwrap_or(variable.kind)
    }

    /// Relabels a resolved decision as a chance node.
    ///
    /// Only the Decision -> Chance transition is allowed, and only once.
    pub fn relabel_as_chance(&mut self, variable: &Variable) -> Result<Variable, InferenceError> {
        let entry = self.variables.get_mut(&variable.id).ok_or_else(|| {
            InferenceError::Internal(format!("relabel of unregistered variable {}", variable))
        })?;
        if entry.kind != NodeKind::Decision {
            return Err(InferenceError::Internal(format!(
                "cannot relabel {} variable {} as chance",
                entry.kind, variable
            )));
        }
        entry.kind = NodeKind::Chance;
        Ok(*entry)
    }

    pub(crate) fn next_factor_id(&mut self) -> FactorId {
        let id = FactorId(self.next_factor);
        self.next_factor += 1;
        id
    }

    /// Advances the factor counter past every id `other` has issued.
    ///
    /// Used after solving on a clone so ids stay unique across solves.
    pub(crate) fn absorb_factor_ids(&mut self, other: &Registry) {
        self.next_factor = self.next_factor.max(other.next_factor);
    }

    /// Builds a factor over `variables`.
    ///
    /// With `data == None` the table is zero-filled. A supplied table must hold
    /// exactly one cell per joint outcome, in row-major order with the last
    /// variable varying fastest.
    pub fn create_factor(
        &mut self,
        variables: &[Variable],
        data: Option<Vec<f64>>,
    ) -> Result<Factor, InferenceError> {
        for (i, v) in variables.iter().enumerate() {
            if variables[..i].contains(v) {
                return Err(InferenceError::ValidationError(format!(
                    "variable {} appears twice in factor axes",
                    v
                )));
            }
        }
        let expected = cell_count(variables);
        let data = match data {
            Some(data) if data.len() != expected => {
                return Err(InferenceError::SizeMismatch {
                    expected,
                    actual: data.len(),
                })
            }
            Some(data) => data,
            None => vec![0.0; expected],
        };
        let axes: Axes = variables.iter().copied().collect();
        Ok(self.assemble(axes, data))
    }

    /// Zero-axis factor holding one value. Used to apply scalar weights.
    pub fn scalar(&mut self, value: f64) -> Factor {
        self.assemble(Axes::new(), vec![value])
    }

    /// Factor over `variables` with every cell set to one.
    pub fn ones(&mut self, variables: &[Variable]) -> Result<Factor, InferenceError> {
        let cells = cell_count(variables);
        self.create_factor(variables, Some(vec![1.0; cells]))
    }

    /// Wraps already-validated parts in a factor with a fresh id.
    pub(crate) fn assemble(&mut self, variables: Axes, data: Vec<f64>) -> Factor {
        let id = self.next_factor_id();
        Factor::from_parts(id, variables, data)
    }
}
