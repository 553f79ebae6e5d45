/// Launch config module.
pub mod launch;
/// Matmul config module.
pub mod matmul;

mod base;
mod logger;

pub use base::*;
pub use logger::{BinaryLogLevel, LogCrateLevel, LogLevel, Logger, LoggerConfig};
