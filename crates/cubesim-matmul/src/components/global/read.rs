use cubesim_runtime::{Numeric, kernel::KernelContext, memory::TensorHandle, pipeline::GlobalSlice};

use crate::components::{FormattedConfigError, InvalidConfigError, stage::StageMemory};

/// Copies a block of a global tensor into a stage.
///
/// Every unit of the cube takes part: unit `u` copies lines `u`, `u + U`, `u + 2U`, ...
/// where `U` is the number of units and a line is `line_size` contiguous elements of a
/// stage row. Consecutive units touch consecutive addresses. Elements outside the tensor
/// are never read and land as zeros in the stage.
pub trait LoadingStrategy: Send + Sync + 'static {
    /// Fails when the strategy can't stage `G` elements as `S`.
    fn check<G: Numeric, S: Numeric>() -> Result<(), InvalidConfigError>;

    /// Issues the copy of the block starting at `(row_offset, col_offset)` of `tensor`.
    fn load<G: Numeric, S: Numeric>(
        ctx: &mut KernelContext<'_>,
        tensor: &TensorHandle<G>,
        stage: &StageMemory<S>,
        row_offset: usize,
        col_offset: usize,
        line_size: u32,
    );

    /// Blocks until the copies issued by this plane landed in shared memory.
    ///
    /// Copies of the other planes need a cube barrier on top.
    fn wait(ctx: &mut KernelContext<'_>);
}

/// Lines of a `rows x cols` stage copied by `unit`, as the `(row, col)` of their first element.
pub fn cyclic_lines(
    unit: u32,
    num_units: u32,
    rows: u32,
    cols: u32,
    line_size: u32,
) -> impl Iterator<Item = (u32, u32)> {
    let lines_per_row = cols / line_size;

    (unit..rows * lines_per_row)
        .step_by(num_units as usize)
        .map(move |line| (line / lines_per_row, (line % lines_per_row) * line_size))
}

/// Reads, casts and writes every element on the plane itself.
pub struct SyncCyclicLoading;

impl LoadingStrategy for SyncCyclicLoading {
    fn check<G: Numeric, S: Numeric>() -> Result<(), InvalidConfigError> {
        Ok(())
    }

    fn load<G: Numeric, S: Numeric>(
        ctx: &mut KernelContext<'_>,
        tensor: &TensorHandle<G>,
        stage: &StageMemory<S>,
        row_offset: usize,
        col_offset: usize,
        line_size: u32,
    ) {
        let layout = stage.layout();

        for lane in ctx.lanes() {
            let unit = ctx.unit_index(lane);
            let lines = cyclic_lines(unit, ctx.num_units(), layout.rows, layout.cols, line_size);

            for (row, col) in lines {
                let tensor_row = row_offset + row as usize;

                for i in 0..line_size {
                    let tensor_col = col_offset + (col + i) as usize;
                    let value = if tensor.in_bounds(tensor_row, tensor_col) {
                        S::cast_from(ctx.read_global(tensor, tensor_row, tensor_col))
                    } else {
                        S::zero()
                    };
                    stage.write(row, col + i, value);
                }
            }
        }
    }

    fn wait(_ctx: &mut KernelContext<'_>) {}
}

/// Issues non-blocking copies through the plane's pipeline.
///
/// Copies can't cast, the global and stage elements must be the same.
pub struct AsyncCyclicLoading;

impl LoadingStrategy for AsyncCyclicLoading {
    fn check<G: Numeric, S: Numeric>() -> Result<(), InvalidConfigError> {
        if G::elem() != S::elem() {
            return Err(FormattedConfigError::new(|| {
                format!(
                    "Asynchronous loading can't cast from {} in global memory to {} in shared memory",
                    G::elem(),
                    S::elem()
                )
            }));
        }

        Ok(())
    }

    fn load<G: Numeric, S: Numeric>(
        ctx: &mut KernelContext<'_>,
        tensor: &TensorHandle<G>,
        stage: &StageMemory<S>,
        row_offset: usize,
        col_offset: usize,
        line_size: u32,
    ) {
        let Some(tensor) = tensor.reinterpret::<S>() else {
            log::warn!(
                "Staging {} as {} asynchronously, falling back to synchronous copies",
                G::elem(),
                S::elem()
            );
            return SyncCyclicLoading::load(ctx, tensor, stage, row_offset, col_offset, line_size);
        };
        let layout = stage.layout();
        let num_units = ctx.num_units();

        for lane in ctx.lanes() {
            let unit = ctx.unit_index(lane);

            for (row, col) in cyclic_lines(unit, num_units, layout.rows, layout.cols, line_size) {
                let tensor_row = row_offset + row as usize;
                let tensor_col = col_offset + col as usize;
                let valid = if tensor.in_bounds(tensor_row, tensor_col) {
                    (line_size as usize).min(tensor.cols() - tensor_col)
                } else {
                    0
                };

                ctx.pipeline().memcpy_async(
                    GlobalSlice::new(&tensor, tensor_row, tensor_col, valid),
                    stage.slice(row, col, line_size),
                );
            }
        }

        ctx.pipeline().commit();
    }

    fn wait(ctx: &mut KernelContext<'_>) {
        ctx.pipeline().wait();
    }
}
