mod accelerated;
mod register;

pub use accelerated::*;
pub use register::*;

use cubesim_runtime::properties::DeviceProperties;
use serde::{Deserialize, Serialize};

use crate::components::{
    AccS, LhsS, MatmulAvailabilityError, MatmulPrecision, RhsS, TileSize, stage::StageTile,
};

/// Which tile matmul computes the fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// The device's matrix multiply-accumulate fragments.
    #[default]
    Accelerated,
    /// Plain registers, any element type and any tile size.
    Register,
}

/// Provides matrix multiplication operations at the tile level.
///
/// At the tile level,
///  - Dimensions M, N and K are fixed by the [tile size](TileSize), and the
///    matrix multiplication works only for size (M, K) · (K, N) = (M, N).
///
/// Assumptions:
///  - Inputs must always be valid. If the actual matrix multiplication
///    should be done on smaller sizes than M, N and K, padding with zeros must be done beforehand.
///  - One plane owns the fragments it allocates.
pub trait TileMatmul<MP: MatmulPrecision>: 'static + Send + Sync {
    /// Contains LHS data
    type Lhs: Send;
    /// Contains RHS data
    type Rhs: Send;
    /// Contains output data
    type Accumulator: Send;

    /// Fails when the device can't run this tile matmul for the precision and tile size.
    fn check_availability(
        properties: &DeviceProperties,
        tile_size: TileSize,
    ) -> Result<(), MatmulAvailabilityError>;

    /// Executes the matrix multiplication of LHS and RHS, adding the result to the accumulator
    fn execute(lhs: &Self::Lhs, rhs: &Self::Rhs, acc: &mut Self::Accumulator);

    /// Create the container for LHS data
    fn allocate_lhs(tile_size: TileSize) -> Self::Lhs;

    /// Fill the container of LHS with data
    fn fill_lhs(tile: &StageTile<'_, LhsS<MP>>, lhs: &mut Self::Lhs);

    /// Create the container for RHS data
    fn allocate_rhs(tile_size: TileSize) -> Self::Rhs;

    /// Fill the container of RHS with data
    fn fill_rhs(tile: &StageTile<'_, RhsS<MP>>, rhs: &mut Self::Rhs);

    /// Allocate the accumulator, filled with zeros.
    fn allocate_accumulator(tile_size: TileSize) -> Self::Accumulator;

    /// Fill the accumulator with zeros.
    fn zero_accumulator(acc: &mut Self::Accumulator);

    /// Write the content of the accumulator to the given tile
    fn write_results(acc: &Self::Accumulator, tile: &StageTile<'_, AccS<MP>>);
}
