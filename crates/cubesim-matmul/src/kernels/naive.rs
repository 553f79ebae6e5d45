//! Naive matmul kernel implementation
//!
//! Each unit computes one output element, reading its row of lhs and its column of rhs
//! directly from global memory.

use core::marker::PhantomData;

use cubesim_runtime::{
    CubeCount, CubeDim, Numeric,
    client::ComputeClient,
    kernel::{Kernel, KernelContext},
    memory::TensorHandle,
};

use crate::components::{
    AccG, AccS, LhsG, LhsS, MatmulAvailabilityError, MatmulPrecision, MatmulProblem,
    MatmulSetupError, RhsG, RhsS,
};

const PLANES_PER_CUBE: u32 = 4;

struct NaiveMatmulKernel<MP: MatmulPrecision> {
    lhs: TensorHandle<LhsG<MP>>,
    rhs: TensorHandle<RhsG<MP>>,
    out: TensorHandle<AccG<MP>>,
    _precision: PhantomData<MP>,
}

impl<MP: MatmulPrecision> Kernel for NaiveMatmulKernel<MP> {
    fn name(&self) -> &str {
        "naive_matmul"
    }

    fn execute(&self, ctx: &mut KernelContext<'_>) {
        let (m, n) = self.out.shape();
        let k = self.lhs.cols();
        let cube_offset = ctx.cube_index() as usize * ctx.num_units() as usize;

        for lane in ctx.lanes() {
            let position = cube_offset + ctx.unit_index(lane) as usize;
            let (row, col) = (position / n, position % n);

            if row >= m {
                continue;
            }

            let mut sum = <AccS<MP> as Numeric>::from_int(0);
            for i in 0..k {
                let lhs = LhsS::<MP>::cast_from(ctx.read_global(&self.lhs, row, i));
                let rhs = RhsS::<MP>::cast_from(ctx.read_global(&self.rhs, i, col));
                sum += AccS::<MP>::cast_from(lhs) * AccS::<MP>::cast_from(rhs);
            }

            ctx.write_global(&self.out, row, col, AccG::<MP>::cast_from(sum));
        }
    }
}

/// Launches the naive matmul computing `out = lhs · rhs`.
pub fn launch_naive<MP: MatmulPrecision>(
    client: &ComputeClient,
    lhs: &TensorHandle<LhsG<MP>>,
    rhs: &TensorHandle<RhsG<MP>>,
    out: &TensorHandle<AccG<MP>>,
) -> Result<(), MatmulSetupError> {
    let problem = MatmulProblem::from_shapes(lhs.shape(), rhs.shape(), out.shape())?;
    let hardware = &client.properties().hardware;

    let cube_dim = CubeDim::new_2d(hardware.plane_size, PLANES_PER_CUBE);
    let num_cubes = (problem.m * problem.n).div_ceil(cube_dim.num_elems() as usize);
    let cube_count = CubeCount::new_1d(u32::try_from(num_cubes).unwrap_or(u32::MAX));
    if cube_count.dims().0 > hardware.max_cube_count.0 {
        return Err(MatmulAvailabilityError::CubeCountTooBig(cube_count).into());
    }

    client.log_matmul(|| format!("Naive matmul {problem:?} with {num_cubes} cubes"));

    let kernel = NaiveMatmulKernel::<MP> {
        lhs: lhs.clone(),
        rhs: rhs.clone(),
        out: out.clone(),
        _precision: PhantomData,
    };

    client.launch(&kernel, cube_count, cube_dim)?;
    Ok(())
}
