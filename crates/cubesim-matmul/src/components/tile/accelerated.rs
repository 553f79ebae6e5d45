use cubesim_runtime::{
    Numeric,
    cmma::{self, Matrix, MatrixIdent, MatrixLayout},
    properties::{DeviceProperties, Feature},
};

use crate::components::{
    AccS, LhsS, MatmulAvailabilityError, MatmulPrecision, RhsS, TileSize, stage::StageTile,
    tile::TileMatmul,
};

/// Uses the device's fragment multiply-accumulate.
pub struct AcceleratedMatmul;

impl<MP: MatmulPrecision> TileMatmul<MP> for AcceleratedMatmul {
    type Lhs = Matrix<LhsS<MP>>;
    type Rhs = Matrix<RhsS<MP>>;
    type Accumulator = Matrix<AccS<MP>>;

    fn check_availability(
        properties: &DeviceProperties,
        tile_size: TileSize,
    ) -> Result<(), MatmulAvailabilityError> {
        let unavailable = || MatmulAvailabilityError::CmmaInstructionUnavailable {
            input: LhsS::<MP>::elem(),
            output: AccS::<MP>::elem(),
            size: Some(tile_size),
        };

        let (Ok(m), Ok(n), Ok(k)) = (
            u8::try_from(tile_size.m()),
            u8::try_from(tile_size.n()),
            u8::try_from(tile_size.k()),
        ) else {
            return Err(unavailable());
        };

        let feature = Feature::Cmma {
            a: LhsS::<MP>::elem(),
            b: RhsS::<MP>::elem(),
            c: AccS::<MP>::elem(),
            m,
            k,
            n,
        };

        if !properties.feature_enabled(feature) {
            return Err(unavailable());
        }

        Ok(())
    }

    fn execute(lhs: &Self::Lhs, rhs: &Self::Rhs, acc: &mut Self::Accumulator) {
        cmma::execute(lhs, rhs, acc);
    }

    fn allocate_lhs(tile_size: TileSize) -> Self::Lhs {
        fragment(MatrixIdent::A, tile_size, MatrixLayout::RowMajor)
    }

    fn fill_lhs(tile: &StageTile<'_, LhsS<MP>>, lhs: &mut Self::Lhs) {
        cmma::load(lhs, tile.memory(), tile.offset(), tile.stride());
    }

    fn allocate_rhs(tile_size: TileSize) -> Self::Rhs {
        fragment(MatrixIdent::B, tile_size, MatrixLayout::RowMajor)
    }

    fn fill_rhs(tile: &StageTile<'_, RhsS<MP>>, rhs: &mut Self::Rhs) {
        cmma::load(rhs, tile.memory(), tile.offset(), tile.stride());
    }

    fn allocate_accumulator(tile_size: TileSize) -> Self::Accumulator {
        fragment(MatrixIdent::Accumulator, tile_size, MatrixLayout::Undefined)
    }

    fn zero_accumulator(acc: &mut Self::Accumulator) {
        cmma::fill(acc, <AccS<MP> as Numeric>::from_int(0));
    }

    fn write_results(acc: &Self::Accumulator, tile: &StageTile<'_, AccS<MP>>) {
        cmma::store(
            tile.memory(),
            acc,
            tile.offset(),
            tile.stride(),
            MatrixLayout::RowMajor,
        );
    }
}

fn fragment<E: Numeric>(ident: MatrixIdent, tile_size: TileSize, layout: MatrixLayout) -> Matrix<E> {
    Matrix::new(
        ident,
        tile_size.m() as usize,
        tile_size.n() as usize,
        tile_size.k() as usize,
        layout,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubesim_runtime::properties::Arch;
    use half::{bf16, f16};

    #[test]
    fn availability_follows_the_device_features() {
        let hopper = DeviceProperties::preset(Arch::Hopper);
        let tile = TileSize::new(16, 16, 16);

        assert!(<AcceleratedMatmul as TileMatmul<f16>>::check_availability(&hopper, tile).is_ok());
        assert!(<AcceleratedMatmul as TileMatmul<bf16>>::check_availability(&hopper, tile).is_ok());
        assert!(matches!(
            <AcceleratedMatmul as TileMatmul<f32>>::check_availability(&hopper, tile),
            Err(MatmulAvailabilityError::CmmaInstructionUnavailable {
                size: Some(size),
                ..
            }) if size == tile
        ));

        let odd = TileSize::new(16, 16, 300);
        assert!(<AcceleratedMatmul as TileMatmul<f16>>::check_availability(&hopper, odd).is_err());

        let pascal = DeviceProperties::preset(Arch::Pascal);
        assert!(<AcceleratedMatmul as TileMatmul<f16>>::check_availability(&pascal, tile).is_err());
    }
}
