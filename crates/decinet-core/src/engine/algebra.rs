//! # Factor Algebra
//!
//! Pure operations over [`Factor`]s. Each returns a new factor; the only
//! state touched is the registry's factor-id counter.
//!
//! | Operation | Result axes |
//! |---|---|
//! | [`restrict`] | input axes minus the observed variable |
//! | [`sum_out`] | input axes minus the summed variable |
//! | [`product`], [`sum`] | ordered union of input axes (first seen wins) |
//! | [`marginal`] | the single requested variable |
//! | [`normalize`], [`invert`] | unchanged |
//! | [`normalize_for`], [`policy`] | the given variable moved last |
//! | [`rearrange`] | the requested permutation |
//!
//! Asking for an axis a factor does not have, an out-of-range outcome, or a
//! non-permutation is an invariant violation and yields
//! [`InferenceError::Internal`].

use crate::engine::errors::InferenceError;
use crate::engine::factor::{Axes, Factor};
use crate::engine::kernels::{combine, CombineOp, KernelBackend, Projection};
use crate::engine::registry::{Registry, Variable};

/// Drops `variable` by fixing it at `outcome`.
pub fn restrict(
    registry: &mut Registry,
    factor: &Factor,
    variable: &Variable,
    outcome: usize,
) -> Result<Factor, InferenceError> {
    let axis = factor.axis_of(variable)?;
    if outcome >= variable.arity() {
        return Err(InferenceError::Internal(format!(
            "observed outcome {} out of range for {} (arity {})",
            outcome,
            variable,
            variable.arity()
        )));
    }
    let axes = without(factor.variables(), axis);
    let stride = factor.strides()[axis];
    let source = Projection::new(&axes, factor.variables(), factor.data()).pin(outcome * stride);
    let data = combine(&axes, &[source], CombineOp::Multiply, KernelBackend::Auto);
    Ok(registry.assemble(axes, data))
}

/// Marginalizes `variable` out by summing over all of its outcomes.
pub fn sum_out(
    registry: &mut Registry,
    factor: &Factor,
    variable: &Variable,
) -> Result<Factor, InferenceError> {
    let axis = factor.axis_of(variable)?;
    let axes = without(factor.variables(), axis);
    let stride = factor.strides()[axis];
    let slices: Vec<Projection<'_>> = (0..variable.arity())
        .map(|k| Projection::new(&axes, factor.variables(), factor.data()).pin(k * stride))
        .collect();
    let data = combine(&axes, &slices, CombineOp::Add, KernelBackend::Auto);
    Ok(registry.assemble(axes, data))
}

/// Pointwise product over the union of the inputs' axes.
///
/// A single input yields a copy. No inputs yields the scalar 1.
pub fn product(registry: &mut Registry, factors: &[&Factor]) -> Result<Factor, InferenceError> {
    combine_all(registry, factors, CombineOp::Multiply, KernelBackend::Auto)
}

/// [`product`] with an explicit kernel backend.
pub fn product_with_backend(
    registry: &mut Registry,
    factors: &[&Factor],
    backend: KernelBackend,
) -> Result<Factor, InferenceError> {
    combine_all(registry, factors, CombineOp::Multiply, backend)
}

/// Pointwise sum over the union of the inputs' axes.
///
/// A single input yields a copy. No inputs yields the scalar 0.
pub fn sum(registry: &mut Registry, factors: &[&Factor]) -> Result<Factor, InferenceError> {
    combine_all(registry, factors, CombineOp::Add, KernelBackend::Auto)
}

/// Multiplies every cell by `weight`.
pub fn scale(registry: &mut Registry, factor: &Factor, weight: f64) -> Result<Factor, InferenceError> {
    let scalar = registry.scalar(weight);
    product(registry, &[factor, &scalar])
}

fn combine_all(
    registry: &mut Registry,
    factors: &[&Factor],
    op: CombineOp,
    backend: KernelBackend,
) -> Result<Factor, InferenceError> {
    if let [single] = factors {
        return Ok(registry.assemble(single.variables().into(), single.data().to_vec()));
    }
    let mut axes = Axes::new();
    for factor in factors {
        for var in factor.variables() {
            if !axes.contains(var) {
                axes.push(*var);
            }
        }
    }
    let sources: Vec<Projection<'_>> = factors
        .iter()
        .map(|f| Projection::new(&axes, f.variables(), f.data()))
        .collect();
    let data = combine(&axes, &sources, op, backend);
    Ok(registry.assemble(axes, data))
}

/// Distribution of `variable` alone, summing every other axis in one pass.
pub fn marginal(
    registry: &mut Registry,
    factor: &Factor,
    variable: &Variable,
) -> Result<Factor, InferenceError> {
    let axis = factor.axis_of(variable)?;
    let stride = factor.strides()[axis];
    let arity = variable.arity();
    let mut data = vec![0.0; arity];
    for (i, value) in factor.data().iter().enumerate() {
        data[(i / stride) % arity] += value;
    }
    let mut axes = Axes::new();
    axes.push(*variable);
    Ok(registry.assemble(axes, data))
}

/// Scales all cells to sum to one.
///
/// A factor whose cells sum to exactly zero is returned unscaled, matching
/// the zero-block rule of [`normalize_for`].
pub fn normalize(registry: &mut Registry, factor: &Factor) -> Result<Factor, InferenceError> {
    let total = factor.total();
    let data = if total == 0.0 {
        factor.data().to_vec()
    } else {
        factor.data().iter().map(|v| v / total).collect()
    };
    Ok(registry.assemble(factor.variables().into(), data))
}

/// Turns `factor` into a conditional distribution of `variable` given the
/// other axes.
///
/// `variable` is moved to the last axis and every contiguous block of its
/// outcomes is scaled to sum to one. Blocks summing to zero stay as they are.
pub fn normalize_for(
    registry: &mut Registry,
    factor: &Factor,
    variable: &Variable,
) -> Result<Factor, InferenceError> {
    let moved = move_last(registry, factor, variable)?;
    let axes: Axes = moved.variables().into();
    let mut data = moved.into_data();
    for block in data.chunks_mut(variable.arity()) {
        let total: f64 = block.iter().sum();
        if total != 0.0 {
            block.iter_mut().for_each(|v| *v /= total);
        }
    }
    Ok(registry.assemble(axes, data))
}

/// Elementwise reciprocal with `1/0` mapped to 0.
pub fn invert(registry: &mut Registry, factor: &Factor) -> Result<Factor, InferenceError> {
    let data = factor
        .data()
        .iter()
        .map(|&v| if v == 0.0 { 0.0 } else { 1.0 / v })
        .collect();
    Ok(registry.assemble(factor.variables().into(), data))
}

/// Permutes the axes of `factor` into `order`.
pub fn rearrange(
    registry: &mut Registry,
    factor: &Factor,
    order: &[Variable],
) -> Result<Factor, InferenceError> {
    let current = factor.variables();
    let is_permutation = order.len() == current.len()
        && order.iter().all(|v| current.contains(v))
        && order
            .iter()
            .enumerate()
            .all(|(i, v)| !order[..i].contains(v));
    if !is_permutation {
        return Err(InferenceError::Internal(format!(
            "axis order {:?} is not a permutation of {:?}",
            order.iter().map(|v| v.id().0).collect::<Vec<_>>(),
            current.iter().map(|v| v.id().0).collect::<Vec<_>>()
        )));
    }
    if order == current {
        return Ok(registry.assemble(current.into(), factor.data().to_vec()));
    }
    let source = Projection::new(order, current, factor.data());
    let data = combine(order, &[source], CombineOp::Multiply, KernelBackend::Auto);
    Ok(registry.assemble(order.into(), data))
}

/// Optimal decision rule for `decision` given every other axis of a
/// utility-valued factor.
///
/// The result has `decision` as its last axis. For each state of the other
/// axes, outcomes tied for the maximum share probability mass 1 equally and
/// all others get 0. Ties are exact floating-point equality.
pub fn policy(
    registry: &mut Registry,
    factor: &Factor,
    decision: &Variable,
) -> Result<Factor, InferenceError> {
    let moved = move_last(registry, factor, decision)?;
    let axes: Axes = moved.variables().into();
    let mut data = moved.into_data();
    for (state, block) in data.chunks_mut(decision.arity()).enumerate() {
        let best = block.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ties = block.iter().filter(|&&v| v == best).count();
        if ties == 0 {
            return Err(InferenceError::NoSolution(format!(
                "no candidate outcome for decision {} in state {}",
                decision, state
            )));
        }
        let share = 1.0 / ties as f64;
        for cell in block.iter_mut() {
            *cell = if *cell == best { share } else { 0.0 };
        }
    }
    Ok(registry.assemble(axes, data))
}

fn move_last(
    registry: &mut Registry,
    factor: &Factor,
    variable: &Variable,
) -> Result<Factor, InferenceError> {
    let axis = factor.axis_of(variable)?;
    let mut order = without(factor.variables(), axis);
    order.push(*variable);
    rearrange(registry, factor, &order)
}

fn without(axes: &[Variable], axis: usize) -> Axes {
    axes.iter()
        .enumerate()
        .filter(|&(i, _)| i != axis)
        .map(|(_, v)| *v)
        .collect()
}
