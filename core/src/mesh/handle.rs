//! Shared mesh assets with reference identity.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::data::CpuMesh;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a mesh asset.
///
/// Identity follows the handle, not the contents: two meshes with identical
/// vertex data loaded through different handles have different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

impl MeshId {
    fn next() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MeshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

/// Handle to a mesh asset.
///
/// Cloning the handle shares the asset and keeps its [`MeshId`].
/// [`instantiate`](Self::instantiate) makes a private copy with a new id,
/// which is what a mesh-owning entity writes per-instance data into.
#[derive(Clone)]
pub struct MeshHandle {
    id: MeshId,
    mesh: Arc<RwLock<CpuMesh>>,
}

impl MeshHandle {
    /// Wrap a mesh into a new asset with a fresh identity.
    pub fn new(mesh: CpuMesh) -> Self {
        Self {
            id: MeshId::next(),
            mesh: Arc::new(RwLock::new(mesh)),
        }
    }

    /// The asset's identity.
    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Deep-copy the mesh into a new asset with its own identity.
    pub fn instantiate(&self) -> Self {
        let mut copy = self.mesh.read().clone();
        let label = match copy.label() {
            Some(label) => format!("{label} (instance)"),
            None => format!("{} (instance)", self.id),
        };
        copy.set_label(label);
        let instance = Self::new(copy);
        log::trace!("instantiated {} from {}", instance.id, self.id);
        instance
    }

    /// Lock the mesh for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, CpuMesh> {
        self.mesh.read()
    }

    /// Lock the mesh for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, CpuMesh> {
        self.mesh.write()
    }

    /// Whether two handles refer to the same asset.
    pub fn same_asset(&self, other: &MeshHandle) -> bool {
        Arc::ptr_eq(&self.mesh, &other.mesh)
    }
}

impl std::fmt::Debug for MeshHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshHandle")
            .field("id", &self.id)
            .field("mesh", &*self.mesh.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn handle() -> MeshHandle {
        MeshHandle::new(
            CpuMesh::new()
                .with_positions(vec![Vec3::zeros(), Vec3::x()])
                .with_normals(vec![Vec3::z(); 2])
                .with_label("pair"),
        )
    }

    #[test]
    fn test_clone_keeps_identity() {
        let a = handle();
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert!(a.same_asset(&b));
    }

    #[test]
    fn test_new_handles_are_distinct() {
        let a = handle();
        let b = handle();
        assert_ne!(a.id(), b.id());
        assert!(!a.same_asset(&b));
    }

    #[test]
    fn test_instantiate_copies_data_with_new_identity() {
        let shared = handle();
        let instance = shared.instantiate();

        assert_ne!(shared.id(), instance.id());
        assert!(!shared.same_asset(&instance));
        assert_eq!(instance.read().positions(), shared.read().positions());
        assert_eq!(instance.read().label(), Some("pair (instance)"));
    }

    #[test]
    fn test_instance_writes_do_not_touch_shared() {
        use crate::mesh::ChannelSink;

        let shared = handle();
        let instance = shared.instantiate();
        instance
            .write()
            .set_channel(2, vec![Vec3::y(); 2])
            .unwrap();

        assert!(instance.read().uv_channel(2).is_some());
        assert!(shared.read().uv_channel(2).is_none());
    }
}
