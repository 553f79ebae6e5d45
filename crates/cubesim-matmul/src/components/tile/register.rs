use cubesim_runtime::{Numeric, properties::DeviceProperties};

use crate::components::{
    AccS, LhsS, MatmulAvailabilityError, MatmulPrecision, RhsS, TileSize, stage::StageTile,
    tile::TileMatmul,
};

/// Computes tiles with plain per-unit arithmetic.
///
/// Available for every precision and tile size. Products are summed along `k` in ascending
/// order in the accumulator precision.
pub struct RegisterMatmul;

/// A row-major tile held in registers.
#[derive(Debug, Clone)]
pub struct RegisterTile<E: Numeric> {
    values: Vec<E>,
    rows: usize,
    cols: usize,
}

impl<E: Numeric> RegisterTile<E> {
    fn new(rows: u32, cols: u32) -> Self {
        Self {
            values: vec![E::zero(); (rows * cols) as usize],
            rows: rows as usize,
            cols: cols as usize,
        }
    }

    fn fill_from(&mut self, tile: &StageTile<'_, E>) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                self.values[row * self.cols + col] = tile.read(row as u32, col as u32);
            }
        }
    }

    fn get(&self, row: usize, col: usize) -> E {
        self.values[row * self.cols + col]
    }
}

impl<MP: MatmulPrecision> TileMatmul<MP> for RegisterMatmul {
    type Lhs = RegisterTile<LhsS<MP>>;
    type Rhs = RegisterTile<RhsS<MP>>;
    type Accumulator = RegisterTile<AccS<MP>>;

    fn check_availability(
        _properties: &DeviceProperties,
        _tile_size: TileSize,
    ) -> Result<(), MatmulAvailabilityError> {
        Ok(())
    }

    fn execute(lhs: &Self::Lhs, rhs: &Self::Rhs, acc: &mut Self::Accumulator) {
        let k = lhs.cols;
        for row in 0..acc.rows {
            for col in 0..acc.cols {
                let mut sum = acc.get(row, col);
                for i in 0..k {
                    sum += AccS::<MP>::cast_from(lhs.get(row, i))
                        * AccS::<MP>::cast_from(rhs.get(i, col));
                }
                acc.values[row * acc.cols + col] = sum;
            }
        }
    }

    fn allocate_lhs(tile_size: TileSize) -> Self::Lhs {
        RegisterTile::new(tile_size.m(), tile_size.k())
    }

    fn fill_lhs(tile: &StageTile<'_, LhsS<MP>>, lhs: &mut Self::Lhs) {
        lhs.fill_from(tile);
    }

    fn allocate_rhs(tile_size: TileSize) -> Self::Rhs {
        RegisterTile::new(tile_size.k(), tile_size.n())
    }

    fn fill_rhs(tile: &StageTile<'_, RhsS<MP>>, rhs: &mut Self::Rhs) {
        rhs.fill_from(tile);
    }

    fn allocate_accumulator(tile_size: TileSize) -> Self::Accumulator {
        RegisterTile::new(tile_size.m(), tile_size.n())
    }

    fn zero_accumulator(acc: &mut Self::Accumulator) {
        acc.values.fill(<AccS<MP> as Numeric>::from_int(0));
    }

    fn write_results(acc: &Self::Accumulator, tile: &StageTile<'_, AccS<MP>>) {
        for row in 0..acc.rows {
            for col in 0..acc.cols {
                tile.write(row as u32, col as u32, acc.get(row, col));
            }
        }
    }
}
