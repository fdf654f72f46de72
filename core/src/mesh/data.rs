//! CPU-side mesh data.
//!
//! This module provides:
//! - [`CpuMesh`] - CPU-side mesh holding positions, normals and UV channels
//! - [`ChannelSink`] - The write contract used to publish per-vertex channels

use crate::math::Vec3;
use crate::smooth::SmoothError;

/// Number of auxiliary per-vertex channel slots on a [`CpuMesh`].
pub const MAX_UV_CHANNELS: usize = 8;

/// An indexed per-vertex channel write target.
///
/// The smoothing core never inspects how a mesh stores its channels; it only
/// hands over one buffer per channel index.
pub trait ChannelSink {
    /// Replace the contents of channel `channel` with `data`.
    ///
    /// `data` must have one entry per vertex.
    fn set_channel(&mut self, channel: usize, data: Vec<Vec3>) -> Result<(), SmoothError>;
}

/// A CPU-side mesh.
///
/// Holds per-vertex positions and normals (same length, same indexing),
/// optional triangle indices, and [`MAX_UV_CHANNELS`] auxiliary channel slots.
///
/// # Example
///
/// ```
/// use meshsmooth_core::math::Vec3;
/// use meshsmooth_core::mesh::CpuMesh;
///
/// let mesh = CpuMesh::new()
///     .with_positions(vec![Vec3::zeros(), Vec3::x(), Vec3::y()])
///     .with_normals(vec![Vec3::z(); 3])
///     .with_indices(vec![0, 1, 2])
///     .with_label("triangle");
///
/// assert_eq!(mesh.vertex_count(), 3);
/// assert!(mesh.is_indexed());
/// ```
#[derive(Clone, Default)]
pub struct CpuMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Option<Vec<u32>>,
    uv_channels: [Option<Vec<Vec3>>; MAX_UV_CHANNELS],
    label: Option<String>,
}

impl CpuMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set vertex positions.
    pub fn with_positions(mut self, positions: Vec<Vec3>) -> Self {
        self.positions = positions;
        self
    }

    /// Set vertex normals.
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    /// Set triangle-list indices.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the vertex positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Get the vertex normals.
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the triangle indices, if any.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Check if this mesh uses indexed drawing.
    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Get the contents of a UV channel.
    ///
    /// Returns `None` for unset or out-of-range channels.
    pub fn uv_channel(&self, channel: usize) -> Option<&[Vec3]> {
        self.uv_channels.get(channel)?.as_deref()
    }

    /// Get the debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Replace the debug label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }
}

impl ChannelSink for CpuMesh {
    fn set_channel(&mut self, channel: usize, data: Vec<Vec3>) -> Result<(), SmoothError> {
        if channel >= MAX_UV_CHANNELS {
            return Err(SmoothError::InvalidChannel {
                channel,
                max: MAX_UV_CHANNELS,
            });
        }
        if data.len() != self.positions.len() {
            return Err(SmoothError::ChannelLength {
                expected: self.positions.len(),
                actual: data.len(),
            });
        }
        self.uv_channels[channel] = Some(data);
        Ok(())
    }
}

impl std::fmt::Debug for CpuMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels: Vec<usize> = self
            .uv_channels
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|_| i))
            .collect();
        f.debug_struct("CpuMesh")
            .field("label", &self.label)
            .field("vertex_count", &self.positions.len())
            .field("index_count", &self.indices.as_ref().map_or(0, Vec::len))
            .field("uv_channels", &channels)
            .finish()
    }
}
