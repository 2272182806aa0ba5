//! # Factors
//!
//! A [`Factor`] is a flat table of weights indexed by an ordered list of
//! variables (its axes). Cells are stored row-major with the **last** axis
//! varying fastest, so the stride of axis `i` is the product of the arities
//! of axes `i+1..`.
//!
//! Factors are immutable once built; every algebra operation in
//! [`crate::engine::algebra`] returns a new factor with a fresh creation id.

use smallvec::SmallVec;

use crate::engine::errors::InferenceError;
use crate::engine::registry::{FactorId, Variable};

/// Inline capacity for axis lists. Most factors in practice have few axes.
pub const INLINE_AXES: usize = 6;

/// Ordered axis list of a factor.
pub type Axes = SmallVec<[Variable; INLINE_AXES]>;

/// Per-axis outcome coordinates (or strides) of a factor cell.
pub type Coords = SmallVec<[usize; INLINE_AXES]>;

/// Number of cells in a table over `variables` (1 for no axes).
pub fn cell_count(variables: &[Variable]) -> usize {
    variables.iter().map(Variable::arity).product()
}

/// Row-major strides for `variables`, last axis fastest.
pub fn strides_for(variables: &[Variable]) -> Coords {
    let mut strides: Coords = SmallVec::from_elem(0, variables.len());
    let mut stride = 1;
    for (slot, var) in strides.iter_mut().zip(variables.iter()).rev() {
        *slot = stride;
        stride *= var.arity();
    }
    strides
}

/// A table of weights over an ordered set of variables.
#[derive(Debug, Clone)]
pub struct Factor {
    id: FactorId,
    variables: Axes,
    data: Vec<f64>,
}

impl Factor {
    pub(crate) fn from_parts(id: FactorId, variables: Axes, data: Vec<f64>) -> Self {
        debug_assert_eq!(
            data.len(),
            cell_count(&variables),
            "factor table length must match axis arities"
        );
        Self {
            id,
            variables,
            data,
        }
    }

    pub fn id(&self) -> FactorId {
        self.id
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// A factor always has at least one cell; this reports whether it has no axes.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.variables.contains(variable)
    }

    /// Axis position of `variable`, if present.
    pub fn position(&self, variable: &Variable) -> Option<usize> {
        self.variables.iter().position(|v| v == variable)
    }

    /// Axis position of `variable`, or an invariant-violation error.
    pub(crate) fn axis_of(&self, variable: &Variable) -> Result<usize, InferenceError> {
        self.position(variable).ok_or_else(|| {
            InferenceError::Internal(format!(
                "variable {} is not an axis of factor {:?}",
                variable, self.id
            ))
        })
    }

    pub fn strides(&self) -> Coords {
        strides_for(&self.variables)
    }

    /// Sum of all cells.
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Flat index of a per-axis outcome vector.
    pub fn index(&self, coords: &[usize]) -> Result<usize, InferenceError> {
        if coords.len() != self.variables.len() {
            return Err(InferenceError::Internal(format!(
                "coordinate vector has {} entries, factor has {} axes",
                coords.len(),
                self.variables.len()
            )));
        }
        let mut index = 0;
        for ((&c, var), stride) in coords
            .iter()
            .zip(self.variables.iter())
            .zip(self.strides())
        {
            if c >= var.arity() {
                return Err(InferenceError::Internal(format!(
                    "outcome {} out of range for {} (arity {})",
                    c,
                    var,
                    var.arity()
                )));
            }
            index += c * stride;
        }
        Ok(index)
    }

    /// Per-axis outcome vector of a flat index. Inverse of [`Factor::index`].
    pub fn outcomes(&self, index: usize) -> Result<Coords, InferenceError> {
        if index >= self.data.len() {
            return Err(InferenceError::Internal(format!(
                "flat index {} out of range for factor with {} cells",
                index,
                self.data.len()
            )));
        }
        Ok(decode(index, &self.variables))
    }

    /// Value of the cell at `coords`.
    pub fn value_at(&self, coords: &[usize]) -> Result<f64, InferenceError> {
        self.index(coords).map(|i| self.data[i])
    }
}

/// Decodes a flat row-major index into per-axis coordinates.
pub(crate) fn decode(mut index: usize, variables: &[Variable]) -> Coords {
    let mut coords: Coords = SmallVec::from_elem(0, variables.len());
    for (slot, var) in coords.iter_mut().zip(variables.iter()).rev() {
        *slot = index % var.arity();
        index /= var.arity();
    }
    coords
}
