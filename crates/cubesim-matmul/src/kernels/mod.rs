pub mod cluster;
pub mod naive;
pub mod tiled;
