use cubesim_runtime::{Numeric, properties::DeviceProperties};

use crate::components::{
    AccS, LhsS, MatmulPrecision, MatmulProblem, PartitionSize, RhsS, StageSize, TileSize,
    TilingScheme, tile::TileKind,
};

/// Sizes and launch shape of a tiled matmul.
#[derive(Debug, Clone)]
pub struct MatmulSelection {
    pub plane_dim: u32,
    pub tiling_scheme: TilingScheme,
    /// Planes per cube. At least one per partition, extra planes stay inactive.
    pub num_planes: u32,
    /// Pads every stage row by one bank.
    pub stage_padding: bool,
}

impl MatmulSelection {
    pub fn builder(tiling_scheme: TilingScheme, plane_dim: u32) -> MatmulSelectionBuilder {
        MatmulSelectionBuilder {
            plane_dim,
            num_planes: tiling_scheme.partitions_in_stage_mn(),
            tiling_scheme,
            stage_padding: true,
        }
    }

    /// Picks a selection suited to the problem and to the fragment shapes of the device.
    ///
    /// Accelerated tiles use the first fragment of [`DeviceProperties::mma_configs`]
    /// supported for the stage and accumulator types, so the largest one and the square
    /// one on a tie. Without any, they fall back to 16x16x16 which setup then reports as
    /// unavailable. Stages
    /// and partitions shrink along small dimensions.
    pub fn for_problem<MP: MatmulPrecision>(
        properties: &DeviceProperties,
        problem: &MatmulProblem,
        tile_kind: TileKind,
    ) -> Self {
        let (tile_m, tile_n, tile_k) = match tile_kind {
            TileKind::Accelerated => properties
                .mma_configs()
                .into_iter()
                .find(|(a, b, c, ..)| {
                    *a == LhsS::<MP>::elem() && *b == RhsS::<MP>::elem() && *c == AccS::<MP>::elem()
                })
                .map(|(_, _, _, m, n, k)| (m as u32, n as u32, k as u32))
                .unwrap_or((16, 16, 16)),
            TileKind::Register => (8, 8, 8),
        };

        let tiles_for = |size: usize, tile: u32| if size > 2 * tile as usize { 2 } else { 1 };

        let partition_m = tile_m * tiles_for(problem.m, tile_m);
        let partition_n = tile_n * tiles_for(problem.n, tile_n);
        let stage_m = partition_m * tiles_for(problem.m, partition_m);
        let stage_n = partition_n * tiles_for(problem.n, partition_n);
        let stage_k = tile_k * tiles_for(problem.k, tile_k);

        let tiling_scheme = TilingScheme {
            tile_size: TileSize::new(tile_m, tile_n, tile_k),
            partition_size: PartitionSize::new(
                partition_m / tile_m,
                partition_n / tile_n,
                stage_k / tile_k,
            ),
            stage_size: StageSize::new(stage_m / partition_m, stage_n / partition_n, 1),
        };

        MatmulSelection::builder(tiling_scheme, properties.hardware.plane_size).build()
    }
}

pub struct MatmulSelectionBuilder {
    plane_dim: u32,
    tiling_scheme: TilingScheme,
    num_planes: u32,
    stage_padding: bool,
}

impl MatmulSelectionBuilder {
    pub fn plane_dim(mut self, plane_dim: u32) -> Self {
        self.plane_dim = plane_dim;
        self
    }

    pub fn num_planes(mut self, num_planes: u32) -> Self {
        self.num_planes = num_planes;
        self
    }

    pub fn stage_padding(mut self, stage_padding: bool) -> Self {
        self.stage_padding = stage_padding;
        self
    }

    pub fn build(self) -> MatmulSelection {
        MatmulSelection {
            plane_dim: self.plane_dim,
            tiling_scheme: self.tiling_scheme,
            num_planes: self.num_planes,
            stage_padding: self.stage_padding,
        }
    }
}
