mod cluster;

pub use cluster::*;

/// Barrier shared by the planes of one cube.
pub type CubeBarrier = std::sync::Barrier;
