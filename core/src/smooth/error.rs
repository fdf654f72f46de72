//! Error types for smoothing requests.

use thiserror::Error;

/// Errors that can occur while computing or applying smoothed normals.
///
/// Every error is local to one request; nothing here leaves shared state
/// half-written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmoothError {
    /// Position and normal buffers have different lengths.
    #[error("position buffer has {positions} entries but normal buffer has {normals}")]
    LengthMismatch {
        /// Number of positions.
        positions: usize,
        /// Number of normals.
        normals: usize,
    },
    /// The target channel index does not exist on the mesh.
    #[error("channel {channel} out of range (mesh has {max} channels)")]
    InvalidChannel {
        /// Requested channel.
        channel: usize,
        /// Number of channels on the mesh.
        max: usize,
    },
    /// Channel data does not have one entry per vertex.
    #[error("channel data has {actual} entries, mesh has {expected} vertices")]
    ChannelLength {
        /// Vertex count of the mesh.
        expected: usize,
        /// Length of the supplied data.
        actual: usize,
    },
    /// The background worker went away before delivering a result.
    #[error("smoothing worker disconnected before delivering a result")]
    WorkerDisconnected,
    /// The computation this request was waiting on was given up.
    #[error("in-flight computation for the shared mesh was abandoned")]
    Abandoned,
}
