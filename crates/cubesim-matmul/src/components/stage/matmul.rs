use crate::components::{
    AccS, LhsS, MatmulPrecision, RhsS, TilingScheme,
    stage::{Accumulators, PlanePartition, StageMemory},
    tile::TileMatmul,
};

/// Computes the partition of one plane from the stages, fragment by fragment.
pub struct PartitionMatmul<MP: MatmulPrecision, TMM: TileMatmul<MP>> {
    tiling_scheme: TilingScheme,
    lhs: TMM::Lhs,
    rhs: Vec<TMM::Rhs>,
}

impl<MP: MatmulPrecision, TMM: TileMatmul<MP>> PartitionMatmul<MP, TMM> {
    pub fn new(tiling_scheme: TilingScheme) -> Self {
        let tile_size = tiling_scheme.tile_size;

        Self {
            lhs: TMM::allocate_lhs(tile_size),
            rhs: (0..tiling_scheme.tiles_in_partition_n())
                .map(|_| TMM::allocate_rhs(tile_size))
                .collect(),
            tiling_scheme,
        }
    }

    /// Accumulates the product of the staged slices of `lhs` and `rhs` for the partition.
    ///
    /// Iterates over `k` fragments, then `m` fragments, then `n` fragments. The rhs
    /// fragments of a `k` step are loaded once and reused for every `m` fragment.
    pub fn execute(
        &mut self,
        lhs_stage: &StageMemory<LhsS<MP>>,
        rhs_stage: &StageMemory<RhsS<MP>>,
        partition: &PlanePartition,
        acc: &mut Accumulators<MP, TMM>,
    ) {
        let scheme = &self.tiling_scheme;
        let tile = scheme.tile_size;
        let tiles_m = scheme.tiles_in_partition_m();
        let tiles_n = scheme.tiles_in_partition_n();
        let row_start = partition.row * tiles_m;
        let col_start = partition.col * tiles_n;

        for k_frag in 0..scheme.tiles_in_stage_k() {
            for (n_frag, rhs) in self.rhs.iter_mut().enumerate() {
                let view = rhs_stage.tile(k_frag, col_start + n_frag as u32, tile.k(), tile.n());
                TMM::fill_rhs(&view, rhs);
            }

            for m_frag in 0..tiles_m {
                let view = lhs_stage.tile(row_start + m_frag, k_frag, tile.m(), tile.k());
                TMM::fill_lhs(&view, &mut self.lhs);

                for (n_frag, rhs) in self.rhs.iter().enumerate() {
                    TMM::execute(&self.lhs, rhs, acc.get_mut(m_frag, n_frag as u32));
                }
            }
        }
    }

    /// Stores every accumulator at its place in the output stage.
    pub fn write_results(
        &self,
        acc: &Accumulators<MP, TMM>,
        out_stage: &StageMemory<AccS<MP>>,
        partition: &PlanePartition,
    ) {
        let scheme = &self.tiling_scheme;
        let tile = scheme.tile_size;
        let tiles_m = scheme.tiles_in_partition_m();
        let tiles_n = scheme.tiles_in_partition_n();

        for m_frag in 0..tiles_m {
            for n_frag in 0..tiles_n {
                let view = out_stage.tile(
                    partition.row * tiles_m + m_frag,
                    partition.col * tiles_n + n_frag,
                    tile.m(),
                    tile.n(),
                );
                TMM::write_results(acc.get(m_frag, n_frag), &view);
            }
        }
    }
}
