use cubesim_runtime::{client::ComputeClient, memory::TensorHandle, properties::DeviceProperties};

use crate::{
    components::{
        AccG, LhsG, MatmulPrecision, MatmulProblem, MatmulSelection, MatmulSetupError, RhsG,
        global::{AsyncCyclicLoading, DoubleBufferingMatmul, GlobalMatmul, SimpleMatmul, SyncCyclicLoading},
        tile::{AcceleratedMatmul, RegisterMatmul, TileKind},
    },
    kernels::{naive, tiled},
};

#[derive(Debug, Clone, Default)]
/// The matmul algorithm to launch
///
/// Tiled strategies take the kind of tile matmul and a selection that can be forced or
/// inferred from the problem.
pub enum Strategy {
    /// Synchronous cyclic loading into one stage per operand.
    Simple(TileKind, Selection),
    /// Asynchronous cyclic loading into one stage per operand.
    SimpleBarrier(TileKind, Selection),
    /// Asynchronous cyclic loading into two stages per operand.
    DoubleBuffering(TileKind, Selection),
    /// One unit per output element, no shared memory.
    Naive,
    #[default]
    /// Tries an accelerated Simple matmul, then a register one if the former is unavailable
    Auto,
}

#[derive(Debug, Clone, Default)]
pub enum Selection {
    /// Use a predefined MatmulSelection
    Forced(MatmulSelection),
    /// Infer the selection from the problem and the device
    #[default]
    Inferred,
}

impl Selection {
    fn resolve<MP: MatmulPrecision>(
        &self,
        properties: &DeviceProperties,
        problem: &MatmulProblem,
        tile_kind: TileKind,
    ) -> MatmulSelection {
        match self {
            Selection::Forced(selection) => selection.clone(),
            Selection::Inferred => MatmulSelection::for_problem::<MP>(properties, problem, tile_kind),
        }
    }
}

/// Launch a matrix multiplication kernel computing `out = lhs · rhs`.
///
/// Every configuration check happens before any kernel runs.
pub fn launch<MP: MatmulPrecision>(
    client: &ComputeClient,
    strategy: &Strategy,
    lhs: &TensorHandle<LhsG<MP>>,
    rhs: &TensorHandle<RhsG<MP>>,
    out: &TensorHandle<AccG<MP>>,
) -> Result<(), MatmulSetupError> {
    match strategy {
        Strategy::Simple(tile, selection) => match tile {
            TileKind::Accelerated => launch_tiled::<MP, SimpleMatmul<AcceleratedMatmul, SyncCyclicLoading>>(
                client, *tile, selection, lhs, rhs, out,
            ),
            TileKind::Register => launch_tiled::<MP, SimpleMatmul<RegisterMatmul, SyncCyclicLoading>>(
                client, *tile, selection, lhs, rhs, out,
            ),
        },
        Strategy::SimpleBarrier(tile, selection) => match tile {
            TileKind::Accelerated => launch_tiled::<MP, SimpleMatmul<AcceleratedMatmul, AsyncCyclicLoading>>(
                client, *tile, selection, lhs, rhs, out,
            ),
            TileKind::Register => launch_tiled::<MP, SimpleMatmul<RegisterMatmul, AsyncCyclicLoading>>(
                client, *tile, selection, lhs, rhs, out,
            ),
        },
        Strategy::DoubleBuffering(tile, selection) => match tile {
            TileKind::Accelerated => launch_tiled::<MP, DoubleBufferingMatmul<AcceleratedMatmul>>(
                client, *tile, selection, lhs, rhs, out,
            ),
            TileKind::Register => launch_tiled::<MP, DoubleBufferingMatmul<RegisterMatmul>>(
                client, *tile, selection, lhs, rhs, out,
            ),
        },
        Strategy::Naive => naive::launch_naive::<MP>(client, lhs, rhs, out),
        Strategy::Auto => {
            let accelerated = Strategy::Simple(TileKind::Accelerated, Selection::Inferred);

            match launch::<MP>(client, &accelerated, lhs, rhs, out) {
                Err(MatmulSetupError::Unavailable(err)) => {
                    log::debug!("Accelerated matmul unavailable, using registers: {err}");
                    let register = Strategy::Simple(TileKind::Register, Selection::Inferred);
                    launch::<MP>(client, &register, lhs, rhs, out)
                }
                result => result,
            }
        }
    }
}

fn launch_tiled<MP: MatmulPrecision, GMM: GlobalMatmul<MP>>(
    client: &ComputeClient,
    tile_kind: TileKind,
    selection: &Selection,
    lhs: &TensorHandle<LhsG<MP>>,
    rhs: &TensorHandle<RhsG<MP>>,
    out: &TensorHandle<AccG<MP>>,
) -> Result<(), MatmulSetupError> {
    let problem = MatmulProblem::from_shapes(lhs.shape(), rhs.shape(), out.shape())?;
    let selection = selection.resolve::<MP>(client.properties(), &problem, tile_kind);

    tiled::launch_tiled::<MP, GMM>(client, lhs, rhs, out, &selection)
}
