//! Table kernels for factor algebra.
//!
//! Every algebra operation reduces to one loop: walk the cells of an output
//! table in row-major order and read, for each source table, the cell whose
//! coordinates are the projection of the output coordinates onto the
//! source's axes. Projection is expressed as a per-output-axis stride into
//! the source (zero when the source lacks that axis), so the walk only adds
//! and subtracts strides and never divides.
//!
//! Optimized paths are always feature-gated and threshold-gated. With the
//! `rayon` feature the output is split into chunks that are filled in
//! parallel; each chunk is computed from read-only inputs exactly as the
//! scalar loop would, so both paths produce bit-identical tables.

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::engine::factor::{decode, strides_for, Coords, INLINE_AXES};
use crate::engine::registry::Variable;

/// Minimum output size before the parallel path is attempted.
pub const PARALLEL_MIN_CELLS: usize = 1 << 15;

/// Cells per parallel work item.
#[cfg(feature = "rayon")]
const PARALLEL_CHUNK_CELLS: usize = 1 << 12;

/// Backend selector for table kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelBackend {
    /// Always use the sequential loop.
    Scalar,
    /// Use the parallel loop for large outputs when available.
    Auto,
}

/// How source cells are folded into an output cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    Multiply,
    Add,
}

impl CombineOp {
    #[inline]
    fn identity(self) -> f64 {
        match self {
            CombineOp::Multiply => 1.0,
            CombineOp::Add => 0.0,
        }
    }

    #[inline]
    fn apply(self, acc: f64, value: f64) -> f64 {
        match self {
            CombineOp::Multiply => acc * value,
            CombineOp::Add => acc + value,
        }
    }
}

/// A source table viewed through the output's axes.
#[derive(Debug, Clone)]
pub(crate) struct Projection<'a> {
    data: &'a [f64],
    /// Stride into `data` per output axis (0 if the source lacks the axis).
    strides: Coords,
    /// Offset added to every read, used to pin a dropped axis to one outcome.
    base: usize,
}

impl<'a> Projection<'a> {
    /// Projects a source with axes `source_axes` onto `output_axes`.
    ///
    /// Source axes absent from the output are pinned at outcome 0 unless
    /// [`Projection::pin`] moves them.
    pub(crate) fn new(output_axes: &[Variable], source_axes: &[Variable], data: &'a [f64]) -> Self {
        let source_strides = strides_for(source_axes);
        let strides = output_axes
            .iter()
            .map(|out| {
                source_axes
                    .iter()
                    .position(|v| v == out)
                    .map_or(0, |pos| source_strides[pos])
            })
            .collect();
        Self {
            data,
            strides,
            base: 0,
        }
    }

    /// Pins a source axis that is not part of the output to `offset`
    /// (its outcome times its stride).
    pub(crate) fn pin(mut self, offset: usize) -> Self {
        self.base += offset;
        self
    }

    #[inline]
    fn offset_of(&self, coords: &[usize]) -> usize {
        self.base
            + coords
                .iter()
                .zip(self.strides.iter())
                .map(|(c, s)| c * s)
                .sum::<usize>()
    }
}

/// Fills a table over `output_axes` by folding the projected cells of every
/// source with `op`.
pub(crate) fn combine(
    output_axes: &[Variable],
    sources: &[Projection<'_>],
    op: CombineOp,
    backend: KernelBackend,
) -> Vec<f64> {
    let cells: usize = output_axes.iter().map(Variable::arity).product();
    let mut out = vec![0.0; cells];

    match backend {
        KernelBackend::Scalar => fill_range(output_axes, sources, op, 0, &mut out),
        KernelBackend::Auto => {
            #[cfg(feature = "rayon")]
            {
                if cells >= PARALLEL_MIN_CELLS {
                    out.par_chunks_mut(PARALLEL_CHUNK_CELLS)
                        .enumerate()
                        .for_each(|(chunk, slice)| {
                            fill_range(
                                output_axes,
                                sources,
                                op,
                                chunk * PARALLEL_CHUNK_CELLS,
                                slice,
                            )
                        });
                    return out;
                }
            }
            fill_range(output_axes, sources, op, 0, &mut out);
        }
    }
    out
}

/// Fills `out`, the cells `start..start + out.len()` of the output table.
fn fill_range(
    output_axes: &[Variable],
    sources: &[Projection<'_>],
    op: CombineOp,
    start: usize,
    out: &mut [f64],
) {
    if out.is_empty() {
        return;
    }
    let arities: Coords = output_axes.iter().map(Variable::arity).collect();
    let mut coords = decode(start, output_axes);
    let mut offsets: SmallVec<[usize; INLINE_AXES]> =
        sources.iter().map(|s| s.offset_of(&coords)).collect();

    for cell in out.iter_mut() {
        let mut acc = op.identity();
        for (source, &offset) in sources.iter().zip(offsets.iter()) {
            acc = op.apply(acc, source.data[offset]);
        }
        *cell = acc;

        // Odometer step, last axis fastest.
        let mut axis = arities.len();
        while axis > 0 {
            axis -= 1;
            coords[axis] += 1;
            for (offset, source) in offsets.iter_mut().zip(sources.iter()) {
                *offset += source.strides[axis];
            }
            if coords[axis] < arities[axis] {
                break;
            }
            for (offset, source) in offsets.iter_mut().zip(sources.iter()) {
                *offset -= source.strides[axis] * arities[axis];
            }
            coords[axis] = 0;
        }
    }
}
