use core::marker::PhantomData;

use cubesim_runtime::{kernel::KernelContext, memory::TensorHandle, properties::DeviceProperties};

use crate::components::{
    AccG, AccS, LhsG, LhsS, MatmulConfig, MatmulIdent, MatmulPrecision, MatmulSetupError,
    RhsG, RhsS,
    config::{LHS_STAGE_ID, OUT_STAGE_ID, RHS_STAGE_ID},
    global::{AsyncCyclicLoading, LoadingStrategy, write_partition},
    stage::{Accumulators, PartitionMatmul, PlanePartition, PlanePartitioner, StageMemory},
    tile::TileMatmul,
};

/// Provides matrix multiplication operations at the global level.
///
/// At the global level,
///  - Every plane of a cube runs [execute](GlobalMatmul::execute).
///  - The cube at position `(x, y)` computes the stage at row `y` and column `x` of the
///    output, iterating over the whole `k` dimension.
///
/// Assumptions:
///  - The launch uses the cube dim of the [config](MatmulConfig).
pub trait GlobalMatmul<MP: MatmulPrecision>: 'static + Send + Sync {
    /// Stages per operand.
    const NUM_STAGES: u32;

    /// Fails when the device or the precision can't run this matmul.
    fn check(
        properties: &DeviceProperties,
        config: &MatmulConfig,
    ) -> Result<(), MatmulSetupError>;

    /// Computes the stage of the cube and writes it to `out`.
    fn execute(
        ctx: &mut KernelContext<'_>,
        lhs: &TensorHandle<LhsG<MP>>,
        rhs: &TensorHandle<RhsG<MP>>,
        out: &TensorHandle<AccG<MP>>,
        config: &MatmulConfig,
    );
}

/// One stage per operand: load, barrier, compute, barrier.
pub struct SimpleMatmul<TMM, L> {
    _phantom: PhantomData<(TMM, L)>,
}

/// Two stages per operand, the copy of the next stage overlaps the compute of the current one.
pub struct DoubleBufferingMatmul<TMM> {
    _phantom: PhantomData<TMM>,
}

fn check_components<MP: MatmulPrecision, TMM: TileMatmul<MP>, L: LoadingStrategy>(
    properties: &DeviceProperties,
    config: &MatmulConfig,
) -> Result<(), MatmulSetupError> {
    TMM::check_availability(properties, config.tiling_scheme.tile_size)?;
    L::check::<LhsG<MP>, LhsS<MP>>()?;
    L::check::<RhsG<MP>, RhsS<MP>>()?;
    Ok(())
}

/// Position of the cube's stage in the output, in elements.
fn stage_origin(ctx: &KernelContext<'_>, config: &MatmulConfig) -> (usize, usize) {
    let cube = ctx.cube_pos();
    let scheme = &config.tiling_scheme;

    (
        cube.y as usize * scheme.elements_in_stage_m() as usize,
        cube.x as usize * scheme.elements_in_stage_n() as usize,
    )
}

#[allow(clippy::too_many_arguments)]
fn write_output<MP: MatmulPrecision, TMM: TileMatmul<MP>>(
    ctx: &KernelContext<'_>,
    partition_matmul: &PartitionMatmul<MP, TMM>,
    acc: &Accumulators<MP, TMM>,
    out: &TensorHandle<AccG<MP>>,
    config: &MatmulConfig,
    partition: &PlanePartition,
    stage_row: usize,
    stage_col: usize,
) {
    if !partition.active {
        return;
    }

    let out_stage =
        StageMemory::<AccS<MP>>::new(ctx, OUT_STAGE_ID, config.stage_layout(MatmulIdent::Out));
    partition_matmul.write_results(acc, &out_stage, partition);
    write_partition(
        ctx,
        &out_stage,
        out,
        partition,
        &config.tiling_scheme,
        stage_row,
        stage_col,
    );
}

impl<MP, TMM, L> GlobalMatmul<MP> for SimpleMatmul<TMM, L>
where
    MP: MatmulPrecision,
    TMM: TileMatmul<MP>,
    L: LoadingStrategy,
{
    const NUM_STAGES: u32 = 1;

    fn check(
        properties: &DeviceProperties,
        config: &MatmulConfig,
    ) -> Result<(), MatmulSetupError> {
        check_components::<MP, TMM, L>(properties, config)
    }

    fn execute(
        ctx: &mut KernelContext<'_>,
        lhs: &TensorHandle<LhsG<MP>>,
        rhs: &TensorHandle<RhsG<MP>>,
        out: &TensorHandle<AccG<MP>>,
        config: &MatmulConfig,
    ) {
        let scheme = config.tiling_scheme;
        let (stage_row, stage_col) = stage_origin(ctx, config);
        let stage_k = scheme.elements_in_stage_k() as usize;

        let lhs_stage =
            StageMemory::<LhsS<MP>>::new(ctx, LHS_STAGE_ID, config.stage_layout(MatmulIdent::Lhs));
        let rhs_stage =
            StageMemory::<RhsS<MP>>::new(ctx, RHS_STAGE_ID, config.stage_layout(MatmulIdent::Rhs));

        let partition = PlanePartitioner::from_tiling_scheme(&scheme).assign(ctx.plane_index());
        let mut partition_matmul = PartitionMatmul::<MP, TMM>::new(scheme);
        let mut acc = Accumulators::<MP, TMM>::new(&scheme);
        acc.zero();

        for k_offset in (0..lhs.cols()).step_by(stage_k) {
            L::load(ctx, lhs, &lhs_stage, stage_row, k_offset, config.line_size(MatmulIdent::Lhs));
            L::load(ctx, rhs, &rhs_stage, k_offset, stage_col, config.line_size(MatmulIdent::Rhs));
            L::wait(ctx);
            ctx.sync_cube();

            if partition.active {
                partition_matmul.execute(&lhs_stage, &rhs_stage, &partition, &mut acc);
            }

            ctx.sync_cube();
        }

        write_output(
            ctx,
            &partition_matmul,
            &acc,
            out,
            config,
            &partition,
            stage_row,
            stage_col,
        );
    }
}

impl<MP, TMM> GlobalMatmul<MP> for DoubleBufferingMatmul<TMM>
where
    MP: MatmulPrecision,
    TMM: TileMatmul<MP>,
{
    const NUM_STAGES: u32 = 2;

    fn check(
        properties: &DeviceProperties,
        config: &MatmulConfig,
    ) -> Result<(), MatmulSetupError> {
        check_components::<MP, TMM, AsyncCyclicLoading>(properties, config)
    }

    fn execute(
        ctx: &mut KernelContext<'_>,
        lhs: &TensorHandle<LhsG<MP>>,
        rhs: &TensorHandle<RhsG<MP>>,
        out: &TensorHandle<AccG<MP>>,
        config: &MatmulConfig,
    ) {
        let scheme = config.tiling_scheme;
        let (stage_row, stage_col) = stage_origin(ctx, config);
        let stage_k = scheme.elements_in_stage_k() as usize;
        let lhs_line = config.line_size(MatmulIdent::Lhs);
        let rhs_line = config.line_size(MatmulIdent::Rhs);

        let lhs_layout = config.stage_layout(MatmulIdent::Lhs);
        let rhs_layout = config.stage_layout(MatmulIdent::Rhs);
        let lhs_stages = [
            StageMemory::<LhsS<MP>>::new(ctx, LHS_STAGE_ID, lhs_layout),
            StageMemory::<LhsS<MP>>::new(ctx, LHS_STAGE_ID + 1, lhs_layout),
        ];
        let rhs_stages = [
            StageMemory::<RhsS<MP>>::new(ctx, RHS_STAGE_ID, rhs_layout),
            StageMemory::<RhsS<MP>>::new(ctx, RHS_STAGE_ID + 1, rhs_layout),
        ];

        let partition = PlanePartitioner::from_tiling_scheme(&scheme).assign(ctx.plane_index());
        let mut partition_matmul = PartitionMatmul::<MP, TMM>::new(scheme);
        let mut acc = Accumulators::<MP, TMM>::new(&scheme);
        acc.zero();

        let num_loops = lhs.cols().div_ceil(stage_k);

        if num_loops > 0 {
            AsyncCyclicLoading::load(ctx, lhs, &lhs_stages[0], stage_row, 0, lhs_line);
            AsyncCyclicLoading::load(ctx, rhs, &rhs_stages[0], 0, stage_col, rhs_line);
        }

        for k_loop in 0..num_loops {
            let current = k_loop % 2;

            // Every plane finished computing on the other buffer after this barrier.
            AsyncCyclicLoading::wait(ctx);
            ctx.sync_cube();

            if k_loop + 1 < num_loops {
                let next = (k_loop + 1) % 2;
                let k_offset = (k_loop + 1) * stage_k;
                AsyncCyclicLoading::load(ctx, lhs, &lhs_stages[next], stage_row, k_offset, lhs_line);
                AsyncCyclicLoading::load(ctx, rhs, &rhs_stages[next], k_offset, stage_col, rhs_line);
            }

            if partition.active {
                partition_matmul.execute(
                    &lhs_stages[current],
                    &rhs_stages[current],
                    &partition,
                    &mut acc,
                );
            }
        }

        write_output(
            ctx,
            &partition_matmul,
            &acc,
            out,
            config,
            &partition,
            stage_row,
            stage_col,
        );
    }
}
