use super::logger::{LogLevel, LoggerConfig};
use crate::ExecutionMode;

/// Settings of the launch scheduler.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LaunchConfig {
    /// Logger for kernel launches.
    #[serde(default)]
    pub logger: LoggerConfig<LaunchLogLevel>,

    /// Maximum number of cubes resident at the same time.
    ///
    /// Defaults to the available parallelism of the host. A wave is always widened to hold
    /// at least one whole cluster.
    #[serde(default)]
    pub max_concurrent_cubes: Option<u32>,

    /// Number of worker threads of the asynchronous copy engine.
    #[serde(default = "copy_workers_default")]
    pub copy_workers: u32,

    /// Execution mode of kernels.
    #[serde(default)]
    pub execution_mode: ExecutionMode,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            max_concurrent_cubes: None,
            copy_workers: copy_workers_default(),
            execution_mode: ExecutionMode::default(),
        }
    }
}

impl LaunchConfig {
    /// Resolves the number of cubes per wave.
    pub fn max_concurrent_cubes(&self) -> u32 {
        match self.max_concurrent_cubes {
            Some(value) => value.max(1),
            None => std::thread::available_parallelism()
                .map(|value| value.get() as u32)
                .unwrap_or(1),
        }
    }
}

fn copy_workers_default() -> u32 {
    2
}

/// Verbosity of launch logs.
#[derive(Default, Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub enum LaunchLogLevel {
    /// No launch is logged.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,
    /// Kernel name, grid and cube shape.
    #[serde(rename = "basic")]
    Basic,
    /// Adds wave scheduling and durations.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for LaunchLogLevel {}
