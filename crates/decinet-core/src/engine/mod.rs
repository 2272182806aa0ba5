//! The inference engine for discrete networks.
//!
//! This module provides:
//! - **errors**: Error types for compilation and inference failures
//! - **registry**: Variable handles, node kinds and id counters
//! - **factor**: Flat row-major tables over ordered variables
//! - **kernels**: Projection/combine loops shared by the algebra
//! - **algebra**: Restrict, sum-out, product, sum, normalize, policy and friends
//! - **ordering**: Elimination-order heuristics
//! - **dependencies**: Informational parents of decisions
//! - **elimination**: The variable-elimination working set
//! - **policy**: Backward induction over decisions
//! - **config**: Solver options

pub mod algebra;
pub mod config;
pub mod dependencies;
pub mod elimination;
pub mod errors;
pub mod factor;
pub mod kernels;
pub mod ordering;
pub mod policy;
pub mod registry;
