#![allow(missing_docs)]

mod launcher;
mod macros;
pub mod test_utils;


pub use launcher::*;
pub use half::{bf16, f16};
