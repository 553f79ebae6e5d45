#![allow(clippy::result_large_err)]

//! Hierarchical tiled matrix multiplication for the CubeSim device.
//!
//! A launch splits the output in stages, one per cube. Every cube copies its lhs and rhs
//! blocks from global to shared memory, then each plane multiplies the partition of the
//! stage it owns with fragment multiply-accumulates and writes it back.

#[macro_use]
extern crate derive_new;

/// Components of the tiled matmul, from tiles to the global loop.
pub mod components;
/// Kernels and their launch functions.
pub mod kernels;
/// Host-side matmul used to validate the kernels.
pub mod reference;

#[cfg(any(test, feature = "export_tests"))]
pub mod tests;

mod base;

pub use base::*;
