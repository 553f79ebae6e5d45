mod matmul;
mod read;
mod write;

pub use matmul::*;
pub use read::*;
pub use write::*;
