use core::fmt::{Debug, Display};

use crate::{CubeCount, CubeDim};

/// Errors that prevent a kernel launch or invalidate its output.
pub enum LaunchError {
    /// The cube holds more units than the device allows.
    CubeDimTooBig(CubeDim),

    /// The number of units in a cube is not a multiple of the plane size.
    CubeDimNotPlaneAligned {
        /// Requested cube dimensions.
        cube_dim: CubeDim,
        /// Plane size of the device.
        plane_dim: u32,
    },

    /// The grid is larger than the device allows along at least one axis.
    CubeCountTooBig(CubeCount),

    /// Clusters are not supported by the device.
    ClusterUnavailable,

    /// The cluster shape is invalid for the device or the grid.
    InvalidCluster {
        /// Requested cluster dimensions, in cubes.
        cluster_dim: CubeDim,
        /// Grid of the launch.
        cube_count: CubeCount,
    },

    /// A cube allocated more shared memory than the device provides.
    SharedMemoryExceeded {
        /// Bytes allocated by the cube.
        requested: usize,
        /// Bytes available per cube.
        available: usize,
    },

    /// Unguarded global memory accesses were detected in checked mode.
    OutOfBounds {
        /// Number of skipped accesses.
        accesses: u64,
    },
}

impl Display for LaunchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Debug for LaunchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LaunchError::CubeDimTooBig(dim) => writeln!(f, "Cube dim too big {dim:?}"),
            LaunchError::CubeDimNotPlaneAligned {
                cube_dim,
                plane_dim,
            } => writeln!(
                f,
                "Cube dim {cube_dim:?} does not hold a whole number of planes of {plane_dim} units"
            ),
            LaunchError::CubeCountTooBig(count) => writeln!(f, "Cube count too big {count:?}"),
            LaunchError::ClusterUnavailable => writeln!(f, "Clusters are not available."),
            LaunchError::InvalidCluster {
                cluster_dim,
                cube_count,
            } => writeln!(
                f,
                "Cluster dim {cluster_dim:?} can't partition cube count {cube_count:?}"
            ),
            LaunchError::SharedMemoryExceeded {
                requested,
                available,
            } => writeln!(
                f,
                "Shared memory exceeded: {requested} bytes requested, {available} bytes available"
            ),
            LaunchError::OutOfBounds { accesses } => {
                writeln!(f, "{accesses} out-of-bounds global memory accesses were skipped")
            }
        }
    }
}

impl std::error::Error for LaunchError {}
