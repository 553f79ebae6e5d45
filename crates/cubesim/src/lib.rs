//! Tiled matrix multiplication on a simulated compute device.
//!
//! ```rust, ignore
//! use cubesim::prelude::*;
//!
//! let client = ComputeClient::default();
//! let lhs = client.create(&[1.0f32, 2.0, 3.0, 4.0], 2, 2);
//! let rhs = client.create(&[5.0f32, 6.0, 7.0, 8.0], 2, 2);
//! let out = client.empty::<f32>(2, 2);
//!
//! cubesim::matmul::launch::<f32>(&client, &Strategy::default(), &lhs, &rhs, &out).unwrap();
//! assert_eq!(client.read(&out), vec![19.0, 22.0, 43.0, 50.0]);
//! ```

pub use cubesim_runtime::*;

#[cfg(feature = "matmul")]
pub use cubesim_matmul as matmul;

pub mod prelude {
    pub use cubesim_runtime::{
        CubeCount, CubeDim, ExecutionMode, Numeric,
        client::ComputeClient,
        memory::TensorHandle,
        properties::{Arch, DeviceProperties},
    };

    #[cfg(feature = "matmul")]
    pub use cubesim_matmul::{
        Selection, Strategy,
        components::{Flex32, MatmulPrecision, MatmulSelection, tile::TileKind},
    };
}
