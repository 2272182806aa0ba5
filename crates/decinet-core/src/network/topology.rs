//! Ordering of the parent graph.

use std::collections::VecDeque;

use crate::engine::errors::InferenceError;

/// Orders nodes so every node follows its parents.
///
/// `parents[i]` lists the parents of node `i`. Among nodes that are ready at
/// the same time, the lower index goes first. Fails with
/// [`InferenceError::CyclicGraph`] when some nodes can never become ready.
pub fn topological_order(parents: &[Vec<usize>]) -> Result<Vec<usize>, InferenceError> {
    let n = parents.len();
    let mut pending = vec![0usize; n];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (child, list) in parents.iter().enumerate() {
        for &parent in list {
            if parent >= n {
                return Err(InferenceError::Internal(format!(
                    "parent index {} out of range for {} nodes",
                    parent, n
                )));
            }
            pending[child] += 1;
            children[parent].push(child);
        }
    }

    let mut ready: VecDeque<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(node) = ready.pop_front() {
        order.push(node);
        let mut unlocked = Vec::new();
        for &child in &children[node] {
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
