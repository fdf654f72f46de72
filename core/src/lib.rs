//! # meshsmooth core
//!
//! Smooth-normal computation for shared mesh assets.
//!
//! - [`smooth::compute_smooth_normals`] averages the normals of vertices that
//!   share a position and returns the result in input order.
//! - [`smooth::MeshResultCache`] memoizes results per mesh identity so every
//!   instance of a shared asset is processed once.
//! - [`smooth::MeshSmoother`] drives one mesh-owning entity through the
//!   request / compute / apply cycle, inline or on a [`compute::SmoothWorker`].

pub mod compute;
pub mod math;
pub mod mesh;
pub mod profiling;
pub mod smooth;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logs the library version. Binaries call this once after installing a logger.
pub fn init() {
    log::info!("meshsmooth core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
