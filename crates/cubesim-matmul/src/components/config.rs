use cubesim_runtime::{CubeCount, CubeDim, Numeric};

use crate::components::{
    AccS, LhsS, MatmulIdent, MatmulPrecision, MatmulProblem, MatmulSelection, RhsS, TilingScheme,
    stage::StageLayout,
};

/// Shared memory ids of the stages. Double buffering uses `id` and `id + 1`.
pub(crate) const LHS_STAGE_ID: u32 = 0;
pub(crate) const RHS_STAGE_ID: u32 = 2;
pub(crate) const OUT_STAGE_ID: u32 = 4;

/// Resolved configuration of a tiled matmul, shared by every plane of a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatmulConfig {
    pub tiling_scheme: TilingScheme,
    pub plane_dim: u32,
    pub num_planes: u32,
    /// Stages per operand, 2 when double buffering.
    pub num_stages: u32,
    lhs_padding: u32,
    rhs_padding: u32,
    out_padding: u32,
    lhs_line_size: u32,
    rhs_line_size: u32,
}

impl MatmulConfig {
    pub fn new<MP: MatmulPrecision>(selection: &MatmulSelection, num_stages: u32) -> Self {
        let padding = |size: usize| {
            if selection.stage_padding {
                StageLayout::bank_padding(size)
            } else {
                0
            }
        };
        let scheme = selection.tiling_scheme;

        Self {
            tiling_scheme: scheme,
            plane_dim: selection.plane_dim,
            num_planes: selection.num_planes,
            num_stages,
            lhs_padding: padding(LhsS::<MP>::elem().size()),
            rhs_padding: padding(RhsS::<MP>::elem().size()),
            out_padding: padding(AccS::<MP>::elem().size()),
            lhs_line_size: line_size(scheme.elements_in_stage_col(MatmulIdent::Lhs)),
            rhs_line_size: line_size(scheme.elements_in_stage_col(MatmulIdent::Rhs)),
        }
    }

    pub fn cube_dim(&self) -> CubeDim {
        CubeDim::new_2d(self.plane_dim, self.num_planes)
    }

    /// One cube per stage of the output: `x` along `n`, `y` along `m`.
    pub fn cube_count(&self, problem: &MatmulProblem) -> CubeCount {
        let stage_m = self.tiling_scheme.elements_in_stage_m() as usize;
        let stage_n = self.tiling_scheme.elements_in_stage_n() as usize;

        CubeCount::new_2d(
            problem.n.div_ceil(stage_n) as u32,
            problem.m.div_ceil(stage_m) as u32,
        )
    }

    pub fn stage_layout(&self, ident: MatmulIdent) -> StageLayout {
        let padding = match ident {
            MatmulIdent::Lhs => self.lhs_padding,
            MatmulIdent::Rhs => self.rhs_padding,
            MatmulIdent::Out => self.out_padding,
        };

        StageLayout::new(
            self.tiling_scheme.elements_in_stage_row(ident),
            self.tiling_scheme.elements_in_stage_col(ident),
            padding,
        )
    }

    /// Elements copied together by one unit when staging.
    pub fn line_size(&self, ident: MatmulIdent) -> u32 {
        match ident {
            MatmulIdent::Lhs => self.lhs_line_size,
            MatmulIdent::Rhs | MatmulIdent::Out => self.rhs_line_size,
        }
    }

    /// Shared memory used by one cube, in bytes.
    pub fn shared_memory_size<MP: MatmulPrecision>(&self) -> usize {
        let lhs = self
            .stage_layout(MatmulIdent::Lhs)
            .bytes(LhsS::<MP>::elem().size());
        let rhs = self
            .stage_layout(MatmulIdent::Rhs)
            .bytes(RhsS::<MP>::elem().size());
        let out = self
            .stage_layout(MatmulIdent::Out)
            .bytes(AccS::<MP>::elem().size());

        (lhs + rhs) * self.num_stages as usize + out
    }
}

fn line_size(cols: u32) -> u32 {
    [8, 4, 2]
        .into_iter()
        .find(|size| cols % size == 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;

    fn config(stage_padding: bool, num_stages: u32) -> MatmulConfig {
        let scheme = TilingScheme::from_element_sizes((16, 16, 16), (32, 32), (64, 64, 32))
            .map_err(|err| err.to_string())
            .unwrap();
        let selection = MatmulSelection::builder(scheme, 32)
            .stage_padding(stage_padding)
            .build();
        MatmulConfig::new::<f16>(&selection, num_stages)
    }

    #[test]
    fn stages_are_padded_per_element_size() {
        let config = config(true, 1);

        assert_eq!(config.cube_dim(), CubeDim::new_2d(32, 4));
        assert_eq!(config.stage_layout(MatmulIdent::Lhs), StageLayout::new(64, 32, 2));
        assert_eq!(config.stage_layout(MatmulIdent::Rhs), StageLayout::new(32, 64, 2));
        assert_eq!(config.stage_layout(MatmulIdent::Out), StageLayout::new(64, 64, 1));
        assert_eq!(config.line_size(MatmulIdent::Lhs), 8);
    }

    #[test]
    fn double_buffering_doubles_the_operand_stages() {
        let single = config(false, 1);
        let double = config(false, 2);

        let operands = (64 * 32 + 32 * 64) * 2;
        let out = 64 * 64 * 4;
        assert_eq!(single.shared_memory_size::<f16>(), operands + out);
        assert_eq!(double.shared_memory_size::<f16>(), 2 * operands + out);
        assert_eq!(
            single.cube_count(&MatmulProblem::new(100, 130, 7)),
            CubeCount::new_2d(3, 2)
        );
    }
}
