#![warn(missing_docs)]

//! CubeSim runtime crate: a simulated compute device.
//!
//! The device follows the usual compute hierarchy. A launch dispatches a grid of **cubes**
//! (thread blocks); every cube holds a number of **planes** (warps) of `plane_dim` **units**
//! (threads) each; cubes can be grouped in **clusters** that rendezvous through an
//! arrive/wait barrier.
//!
//! Every plane runs on its own OS thread and simulates its lanes in lockstep. Planes of a
//! cube share [shared memory](memory::SharedMemory) and a cube barrier, asynchronous copies
//! from global to shared memory are executed by a [copy engine](pipeline) on dedicated
//! worker threads.

#[macro_use]
extern crate derive_new;

/// Fixed-shape matrix multiply-accumulate fragments.
pub mod cmma;
/// Compute client module.
pub mod client;
/// Runtime configuration and logging.
pub mod config;
/// Kernel definition and per-plane execution context.
pub mod kernel;
/// Global and shared memory.
pub mod memory;
/// Asynchronous global to shared memory copies.
pub mod pipeline;
/// Device properties, architecture presets and occupancy.
pub mod properties;
/// Cube and cluster synchronization primitives.
pub mod sync;

mod element;
mod error;
mod scheduler;
mod topology;

pub use element::*;
pub use error::*;
pub use topology::*;
