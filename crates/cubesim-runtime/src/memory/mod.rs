mod bank;
mod global;
mod shared;

pub use bank::*;
pub use global::*;
pub use shared::*;
