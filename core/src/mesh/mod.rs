//! CPU-side mesh types and generators.
//!
//! This module provides the host-side mesh the smoothing core reads from and
//! writes into:
//!
//! - [`CpuMesh`] - Positions, normals, optional indices and UV channel slots
//! - [`ChannelSink`] - Indexed per-vertex channel write target
//! - [`MeshHandle`] / [`MeshId`] - Shared mesh asset with reference identity
//! - Generators for test shapes (sphere, cube)

mod data;
pub mod generators;
mod handle;

pub use data::{ChannelSink, CpuMesh, MAX_UV_CHANNELS};
pub use handle::{MeshHandle, MeshId};
