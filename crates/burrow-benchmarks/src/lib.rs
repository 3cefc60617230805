//! Burrow benchmarking suite
//!
//! Criterion benchmarks for the version algebra, descriptor and project
//! parsing, fingerprinting, and full resolution passes over in-memory
//! mirrors.

pub mod common;

pub use common::*;
