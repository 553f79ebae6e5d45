use core::marker::PhantomData;

use crate::components::{MatmulPrecision, TilingScheme, tile::TileMatmul};

/// The accumulators of one plane, one fragment per tile of its partition.
///
/// Created zeroed, updated across every stage along `k` and written out once.
pub struct Accumulators<MP: MatmulPrecision, TMM: TileMatmul<MP>> {
    tiles: Vec<TMM::Accumulator>,
    tiles_n: u32,
    _precision: PhantomData<MP>,
}

impl<MP: MatmulPrecision, TMM: TileMatmul<MP>> Accumulators<MP, TMM> {
    pub fn new(tiling_scheme: &TilingScheme) -> Self {
        let count = tiling_scheme.tiles_in_partition_m() * tiling_scheme.tiles_in_partition_n();

        Self {
            tiles: (0..count)
                .map(|_| TMM::allocate_accumulator(tiling_scheme.tile_size))
                .collect(),
            tiles_n: tiling_scheme.tiles_in_partition_n(),
            _precision: PhantomData,
        }
    }

    pub fn get(&self, m: u32, n: u32) -> &TMM::Accumulator {
        &self.tiles[(m * self.tiles_n + n) as usize]
    }

    pub fn get_mut(&mut self, m: u32, n: u32) -> &mut TMM::Accumulator {
        &mut self.tiles[(m * self.tiles_n + n) as usize]
    }

    pub fn zero(&mut self) {
        for tile in self.tiles.iter_mut() {
            TMM::zero_accumulator(tile);
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
