use cubesim_runtime::{CubeCount, CubeDim, Elem, LaunchError};
use std::fmt::{Debug, Display};

use crate::components::TileSize;

/// Errors that can occur during the setup phase of a matmul operation.
pub enum MatmulSetupError {
    /// A required hardware or runtime feature is not available.
    Unavailable(MatmulAvailabilityError),

    /// The provided configuration is invalid or rejected by a component.
    InvalidConfig(InvalidConfigError),

    /// The device rejected the launch.
    Launch(LaunchError),
}

/// A specific feature required for matmul is not available on the device.
pub enum MatmulAvailabilityError {
    /// The requested cube count exceeds what the device supports.
    CubeCountTooBig(CubeCount),

    /// The requested cube dimensions are too large for the device.
    CubeDimTooBig(CubeDim),

    /// The requested plane dimension is not supported.
    PlaneDimUnsupported { plane_dim: u32 },

    /// The required CMMA instruction is not supported for the given element types and tile size.
    CmmaInstructionUnavailable {
        input: Elem,
        output: Elem,
        size: Option<TileSize>,
    },

    /// The stages don't fit in the shared memory of a cube.
    SharedMemoryTooSmall { requested: usize, available: usize },
}

impl From<MatmulAvailabilityError> for MatmulSetupError {
    fn from(value: MatmulAvailabilityError) -> Self {
        Self::Unavailable(value)
    }
}

impl From<InvalidConfigError> for MatmulSetupError {
    fn from(value: InvalidConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}

impl From<LaunchError> for MatmulSetupError {
    fn from(value: LaunchError) -> Self {
        Self::Launch(value)
    }
}

impl Display for MatmulSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Debug for MatmulSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatmulSetupError::Unavailable(err) => {
                writeln!(
                    f,
                    "Unable to launch matmul because a required feature is unavailable: {err:?}"
                )
            }
            MatmulSetupError::InvalidConfig(err) => {
                writeln!(
                    f,
                    "Unable to launch matmul because the config is invalid: {:?}",
                    err.to_string()
                )
            }
            MatmulSetupError::Launch(err) => {
                writeln!(f, "Unable to launch matmul because the device refused it: {err}")
            }
        }
    }
}

impl std::error::Error for MatmulSetupError {}

impl Display for MatmulAvailabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Debug for MatmulAvailabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatmulAvailabilityError::CubeCountTooBig(count) => {
                writeln!(f, "Cube count too big {count:?}")
            }
            MatmulAvailabilityError::CubeDimTooBig(dim) => {
                writeln!(f, "Cube dim too big {dim:?}")
            }
            MatmulAvailabilityError::PlaneDimUnsupported { plane_dim } => {
                writeln!(
                    f,
                    "Plane dimension unsupported: {plane_dim}. Only 32 & 64 are supported."
                )
            }
            MatmulAvailabilityError::CmmaInstructionUnavailable {
                input,
                output,
                size: Some(size),
            } => writeln!(
                f,
                "Cmma on inputs {input:?} and outputs {output:?} with shape m={}, n={}, k={} not supported.",
                size.m(),
                size.n(),
                size.k()
            ),
            MatmulAvailabilityError::CmmaInstructionUnavailable {
                input,
                output,
                size: None,
            } => writeln!(f, "Cmma on inputs {input:?} and outputs {output:?}."),
            MatmulAvailabilityError::SharedMemoryTooSmall {
                requested,
                available,
            } => writeln!(
                f,
                "Stages need {requested} bytes of shared memory, only {available} available."
            ),
        }
    }
}

/// Error that arises from invalid configurations.
pub type InvalidConfigError = Box<dyn Display>;

/// Error that arises from invalid configurations, formatted lazily.
pub struct FormattedConfigError {
    func: Box<dyn Fn() -> String>,
}

impl FormattedConfigError {
    #[allow(clippy::new_ret_no_self)]
    pub fn new<F: Fn() -> String + 'static>(func: F) -> Box<dyn Display> {
        Box::new(Self {
            func: Box::new(func),
        })
    }
}

impl Display for FormattedConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = (self.func)();
        write!(f, "{string}")
    }
}
