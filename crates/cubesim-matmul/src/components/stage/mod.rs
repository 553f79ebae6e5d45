mod fragments;
mod matmul;
mod memory;
mod partitioner;

pub use fragments::*;
pub use matmul::*;
pub use memory::*;
pub use partitioner::*;
