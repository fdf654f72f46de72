//! Smooth normals for shared meshes.
//!
//! - [`compute_smooth_normals`] and [`PositionGroups`]: the pure computation
//! - [`MeshResultCache`]: results per mesh identity, with in-flight markers
//! - [`MeshSmoother`]: per-entity request / compute / apply state machine
//! - [`SmoothError`]: failures of a single request

mod cache;
mod error;
mod normals;
mod smoother;

pub use cache::{Acquire, InFlight, MeshResultCache, Reservation, SmoothedMesh};
pub use error::SmoothError;
pub use normals::{PositionGroups, compute_smooth_normals};
pub use smoother::{
    Completion, DEFAULT_SMOOTH_NORMAL_CHANNEL, MeshSmoother, SmoothRequest, SmoothState,
    SmootherConfig,
};
