use cubesim_runtime::{Numeric, kernel::KernelContext, memory::TensorHandle};

use crate::components::{
    TilingScheme,
    stage::{PlanePartition, StageMemory},
};

/// Writes the partition of a plane from the output stage to global memory.
///
/// Lane `l` writes the elements `l`, `l + plane_dim`, ... of the partition, row-major.
/// Elements outside the output are skipped, so every element of the output is written
/// exactly once by the whole launch.
pub fn write_partition<EA: Numeric, EO: Numeric>(
    ctx: &KernelContext<'_>,
    out_stage: &StageMemory<EA>,
    out: &TensorHandle<EO>,
    partition: &PlanePartition,
    tiling_scheme: &TilingScheme,
    stage_row: usize,
    stage_col: usize,
) {
    let rows = tiling_scheme.elements_in_partition_m();
    let cols = tiling_scheme.elements_in_partition_n();
    let row_start = partition.row * rows;
    let col_start = partition.col * cols;

    for lane in ctx.lanes() {
        for element in (lane..rows * cols).step_by(ctx.plane_dim() as usize) {
            let row = row_start + element / cols;
            let col = col_start + element % cols;
            let out_row = stage_row + row as usize;
            let out_col = stage_col + col as usize;

            if out.in_bounds(out_row, out_col) {
                let value = EO::cast_from(out_stage.read(row, col));
                ctx.write_global(out, out_row, out_col, value);
            }
        }
    }
}
