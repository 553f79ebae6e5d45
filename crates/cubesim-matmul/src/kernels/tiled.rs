use core::marker::PhantomData;

use cubesim_runtime::{
    client::ComputeClient,
    kernel::{Kernel, KernelContext},
    memory::TensorHandle,
};

use crate::components::{
    AccG, FormattedConfigError, LhsG, MatmulAvailabilityError, MatmulConfig, MatmulPrecision,
    MatmulProblem, MatmulSelection, MatmulSetupError, RhsG, global::GlobalMatmul,
};

/// A tiled matmul launched with one cube per output stage.
pub struct TiledMatmulKernel<MP: MatmulPrecision, GMM: GlobalMatmul<MP>> {
    lhs: TensorHandle<LhsG<MP>>,
    rhs: TensorHandle<RhsG<MP>>,
    out: TensorHandle<AccG<MP>>,
    config: MatmulConfig,
    _global: PhantomData<GMM>,
}

impl<MP: MatmulPrecision, GMM: GlobalMatmul<MP>> Kernel for TiledMatmulKernel<MP, GMM> {
    fn name(&self) -> &str {
        "tiled_matmul"
    }

    fn execute(&self, ctx: &mut KernelContext<'_>) {
        GMM::execute(ctx, &self.lhs, &self.rhs, &self.out, &self.config);
    }
}

/// Resolves the configuration of a tiled matmul and checks it against the device.
///
/// Every check runs before anything is launched.
pub fn setup<MP: MatmulPrecision, GMM: GlobalMatmul<MP>>(
    client: &ComputeClient,
    problem: &MatmulProblem,
    selection: &MatmulSelection,
) -> Result<MatmulConfig, MatmulSetupError> {
    let properties = client.properties();
    let hardware = &properties.hardware;

    if !matches!(selection.plane_dim, 32 | 64) || selection.plane_dim != hardware.plane_size {
        return Err(MatmulAvailabilityError::PlaneDimUnsupported {
            plane_dim: selection.plane_dim,
        }
        .into());
    }

    selection.tiling_scheme.validate()?;

    let config = MatmulConfig::new::<MP>(selection, GMM::NUM_STAGES);

    let num_planes_needed = config.tiling_scheme.partitions_in_stage_mn();
    if config.num_planes < num_planes_needed {
        let num_planes = config.num_planes;
        return Err(MatmulSetupError::InvalidConfig(FormattedConfigError::new(
            move || {
                format!(
                    "Error: Number of planes {num_planes} should be at least {num_planes_needed}."
                )
            },
        )));
    }

    GMM::check(properties, &config)?;

    let cube_dim = config.cube_dim();
    if cube_dim.num_elems() > hardware.max_units_per_cube {
        return Err(MatmulAvailabilityError::CubeDimTooBig(cube_dim).into());
    }

    let requested = config.shared_memory_size::<MP>();
    if requested > hardware.max_shared_memory_size {
        return Err(MatmulAvailabilityError::SharedMemoryTooSmall {
            requested,
            available: hardware.max_shared_memory_size,
        }
        .into());
    }

    let cube_count = config.cube_count(problem);
    let (x, y, _) = cube_count.dims();
    if x > hardware.max_cube_count.0 || y > hardware.max_cube_count.1 {
        return Err(MatmulAvailabilityError::CubeCountTooBig(cube_count).into());
    }

    Ok(config)
}

/// Launches a tiled matmul computing `out = lhs · rhs`.
pub fn launch_tiled<MP: MatmulPrecision, GMM: GlobalMatmul<MP>>(
    client: &ComputeClient,
    lhs: &TensorHandle<LhsG<MP>>,
    rhs: &TensorHandle<RhsG<MP>>,
    out: &TensorHandle<AccG<MP>>,
    selection: &MatmulSelection,
) -> Result<(), MatmulSetupError> {
    let problem = MatmulProblem::from_shapes(lhs.shape(), rhs.shape(), out.shape())?;
    let config = setup::<MP, GMM>(client, &problem, selection)?;
    let cube_count = config.cube_count(&problem);

    client.log_matmul(|| {
        format!(
            "Tiled matmul {problem:?} with {} cubes of {} planes, tiling {:?}",
            cube_count.num_cubes(),
            config.num_planes,
            config.tiling_scheme,
        )
    });

    let kernel = TiledMatmulKernel::<MP, GMM> {
        lhs: lhs.clone(),
        rhs: rhs.clone(),
        out: out.clone(),
        config,
        _global: PhantomData,
    };

    client.launch(&kernel, cube_count, config.cube_dim())?;
    Ok(())
}
