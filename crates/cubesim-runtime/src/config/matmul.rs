use super::logger::{BinaryLogLevel, LoggerConfig};

/// Settings of the matmul engine.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MatmulConfig {
    /// Logger for selections and setup failures.
    #[serde(default)]
    pub logger: LoggerConfig<MatmulLogLevel>,
}

/// Verbosity of matmul logs.
pub type MatmulLogLevel = BinaryLogLevel;
