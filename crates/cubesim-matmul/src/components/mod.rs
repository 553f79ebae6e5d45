pub mod global;
pub mod stage;
pub mod tile;

mod config;
mod error;
mod ident;
mod precision;
mod problem;
mod selection;
mod tiling_scheme;

pub use config::*;
pub use error::*;
pub use ident::*;
pub use precision::*;
pub use problem::*;
pub use selection::*;
pub use tiling_scheme::*;
