use core::fmt::Debug;
use serde::{Deserialize, Serialize};

/// Specifies the number of cubes to be dispatched for a kernel.
///
/// This translates to a grid of thread blocks on a real device.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeCount {
    /// Dispatch a known count of x, y, z cubes.
    Static(u32, u32, u32),
}

impl CubeCount {
    /// Create a new static cube count with the given x = y = z = 1.
    pub fn new_single() -> Self {
        CubeCount::Static(1, 1, 1)
    }

    /// Create a new static cube count with the given x, and y = z = 1.
    pub fn new_1d(x: u32) -> Self {
        CubeCount::Static(x, 1, 1)
    }

    /// Create a new static cube count with the given x and y, and z = 1.
    pub fn new_2d(x: u32, y: u32) -> Self {
        CubeCount::Static(x, y, 1)
    }

    /// Create a new static cube count with the given x, y and z.
    pub fn new_3d(x: u32, y: u32, z: u32) -> Self {
        CubeCount::Static(x, y, z)
    }

    /// Number of cubes along each axis.
    pub fn dims(&self) -> (u32, u32, u32) {
        match self {
            CubeCount::Static(x, y, z) => (*x, *y, *z),
        }
    }

    /// Total number of cubes.
    pub fn num_cubes(&self) -> u32 {
        let (x, y, z) = self.dims();
        x * y * z
    }
}

impl Debug for CubeCount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CubeCount::Static(x, y, z) => f.write_fmt(format_args!("({x}, {y}, {z})")),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
/// The number of units across all 3 axis totalling to the number of working units in a cube.
///
/// Also used to describe the shape of a cluster, in which case it counts cubes.
pub struct CubeDim {
    /// The number of units in the x axis.
    pub x: u32,
    /// The number of units in the y axis.
    pub y: u32,
    /// The number of units in the z axis.
    pub z: u32,
}

impl CubeDim {
    /// Create a new cube dim with x = y = z = 1.
    pub const fn new_single() -> Self {
        Self { x: 1, y: 1, z: 1 }
    }

    /// Create a new cube dim with the given x, and y = z = 1.
    pub const fn new_1d(x: u32) -> Self {
        Self { x, y: 1, z: 1 }
    }

    /// Create a new cube dim with the given x and y, and z = 1.
    ///
    /// Kernels built on planes use `x = plane_dim` and `y = num_planes`.
    pub const fn new_2d(x: u32, y: u32) -> Self {
        Self { x, y, z: 1 }
    }

    /// Create a new cube dim with the given x, y and z.
    pub const fn new_3d(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total numbers of units per cube
    pub const fn num_elems(&self) -> u32 {
        self.x * self.y * self.z
    }
}

impl From<(u32, u32, u32)> for CubeDim {
    fn from(value: (u32, u32, u32)) -> Self {
        CubeDim::new_3d(value.0, value.1, value.2)
    }
}

impl From<CubeDim> for (u32, u32, u32) {
    fn from(val: CubeDim) -> Self {
        (val.x, val.y, val.z)
    }
}

/// Position of a cube in the launch grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, new)]
pub struct CubePos {
    /// Position along x.
    pub x: u32,
    /// Position along y.
    pub y: u32,
    /// Position along z.
    pub z: u32,
}

impl CubePos {
    /// Linear position, x being the fastest moving axis.
    pub fn linear(&self, count: &CubeCount) -> u32 {
        let (cx, cy, _) = count.dims();
        (self.z * cy + self.y) * cx + self.x
    }

    /// Position of the cluster containing this cube.
    pub fn cluster(&self, cluster_dim: &CubeDim) -> CubePos {
        CubePos::new(
            self.x / cluster_dim.x,
            self.y / cluster_dim.y,
            self.z / cluster_dim.z,
        )
    }

    /// Rank of this cube inside its cluster, x being the fastest moving axis.
    pub fn rank_in_cluster(&self, cluster_dim: &CubeDim) -> u32 {
        let rank_x = self.x % cluster_dim.x;
        let rank_y = self.y % cluster_dim.y;
        let rank_z = self.z % cluster_dim.z;
        (rank_z * cluster_dim.y + rank_y) * cluster_dim.x + rank_x
    }
}

/// The kind of execution to be performed.
#[derive(Default, Hash, PartialEq, Eq, Clone, Debug, Copy, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Every global access is bounds checked against the logical shape and every output
    /// write is counted. Out-of-bounds accesses are skipped and make the launch fail.
    #[default]
    #[serde(rename = "checked")]
    Checked,
    /// Accesses go straight to the buffer.
    #[serde(rename = "unchecked")]
    Unchecked,
}
