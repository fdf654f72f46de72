//! Memoization of smoothing results per mesh identity.
//!
//! A [`MeshResultCache`] is an explicitly owned object, usually shared as
//! `Arc<MeshResultCache>` by every [`MeshSmoother`](super::MeshSmoother) of a
//! pipeline. Entries live as long as the cache; there is no eviction.
//!
//! Each result is reachable under two identities: the shared source asset and
//! the per-instance copy that carries the smoothed channel. Both keys hold the
//! same `Arc`, so lookups through either return one object.
//!
//! While a source is being computed its key holds an [`InFlight`] marker, so a
//! second request for the same asset waits instead of computing again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::math::Vec3;
use crate::mesh::{MeshHandle, MeshId};

/// A smoothing result shared by every instance of one source mesh.
#[derive(Debug)]
pub struct SmoothedMesh {
    source: MeshId,
    mesh: MeshHandle,
    normals: Arc<[Vec3]>,
}

impl SmoothedMesh {
    /// Identity of the shared mesh the result was computed from.
    pub fn source(&self) -> MeshId {
        self.source
    }

    /// The per-instance mesh that carries the smoothed channel.
    pub fn mesh(&self) -> &MeshHandle {
        &self.mesh
    }

    /// The smoothed normals, indexed like the source mesh's vertices.
    pub fn normals(&self) -> &Arc<[Vec3]> {
        &self.normals
    }

    /// Number of vertices the result covers.
    pub fn vertex_count(&self) -> usize {
        self.normals.len()
    }
}

/// Marker for a computation that has been started but not recorded yet.
#[derive(Debug, Default)]
pub struct InFlight {
    result: OnceLock<Arc<SmoothedMesh>>,
    abandoned: AtomicBool,
}

impl InFlight {
    /// The result, once recorded.
    pub fn get(&self) -> Option<Arc<SmoothedMesh>> {
        self.result.get().cloned()
    }

    /// True if the computing request gave up without recording a result.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }
}

enum Slot {
    Ready(Arc<SmoothedMesh>),
    InFlight(Arc<InFlight>),
}

/// Outcome of [`MeshResultCache::acquire`].
pub enum Acquire {
    /// A ready result exists.
    Hit(Arc<SmoothedMesh>),
    /// Another request is computing this source; wait on the marker.
    Wait(Arc<InFlight>),
    /// The caller now owns the computation for this source.
    Compute(Reservation),
}

/// Ownership of an in-flight computation.
///
/// Call [`fulfill`](Self::fulfill) with the result. Dropping the reservation
/// unfulfilled removes the marker so the next request computes again.
pub struct Reservation {
    cache: Arc<MeshResultCache>,
    source: MeshId,
    marker: Arc<InFlight>,
    fulfilled: bool,
}

impl Reservation {
    /// Identity of the source mesh being computed.
    pub fn source(&self) -> MeshId {
        self.source
    }

    /// Record the result under the source and the instance identity.
    ///
    /// If a result for the source was recorded in the meantime, that one is
    /// returned and `instance` is discarded.
    pub fn fulfill(mut self, instance: MeshHandle, normals: Arc<[Vec3]>) -> Arc<SmoothedMesh> {
        self.fulfilled = true;
        self.cache.record(self.source, instance, normals)
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.fulfilled {
            self.cache.abandon(self.source, &self.marker);
        }
    }
}

/// Cache of smoothing results keyed by mesh identity.
///
/// All access goes through one mutex; the table is safe to share between
/// threads.
#[derive(Default)]
pub struct MeshResultCache {
    entries: Mutex<HashMap<MeshId, Slot>>,
}

impl MeshResultCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a ready result by source or instance identity.
    pub fn try_get(&self, id: MeshId) -> Option<Arc<SmoothedMesh>> {
        match self.entries.lock().get(&id) {
            Some(Slot::Ready(result)) => Some(result.clone()),
            _ => None,
        }
    }

    /// Whether a ready result exists for `id`.
    pub fn contains(&self, id: MeshId) -> bool {
        matches!(self.entries.lock().get(&id), Some(Slot::Ready(_)))
    }

    /// Look up `source`, reserving the computation on a miss.
    ///
    /// A ready result whose vertex count differs from `vertex_count` is stale
    /// (the asset changed under the same handle); it is invalidated together
    /// with its aliases and the call proceeds as a miss.
    pub fn acquire(self: &Arc<Self>, source: MeshId, vertex_count: usize) -> Acquire {
        let mut entries = self.entries.lock();

        match entries.get(&source) {
            Some(Slot::Ready(result)) if result.vertex_count() == vertex_count => {
                log::trace!("cache hit for {source}");
                return Acquire::Hit(result.clone());
            }
            Some(Slot::Ready(result)) => {
                log::warn!(
                    "cached result for {source} covers {} vertices but the mesh has {vertex_count}; recomputing",
                    result.vertex_count()
                );
                let stale = result.clone();
                remove_aliases(&mut entries, &stale);
            }
            Some(Slot::InFlight(marker)) => {
                log::trace!("{source} already in flight, waiting");
                return Acquire::Wait(marker.clone());
            }
            None => {}
        }

        let marker = Arc::new(InFlight::default());
        entries.insert(source, Slot::InFlight(marker.clone()));
        log::trace!("cache miss for {source}, reserved");
        Acquire::Compute(Reservation {
            cache: self.clone(),
            source,
            marker,
            fulfilled: false,
        })
    }

    /// Register `instance` and `source` as aliases of one result.
    ///
    /// The first ready result for a source wins: if one already exists it is
    /// returned unchanged. Waiters on an in-flight marker for `source` are
    /// released with the recorded result.
    pub fn record(
        &self,
        source: MeshId,
        instance: MeshHandle,
        normals: Arc<[Vec3]>,
    ) -> Arc<SmoothedMesh> {
        let mut entries = self.entries.lock();

        if let Some(Slot::Ready(existing)) = entries.get(&source) {
            log::debug!("{source} already recorded, discarding {}", instance.id());
            return existing.clone();
        }

        let instance_id = instance.id();
        let result = Arc::new(SmoothedMesh {
            source,
            mesh: instance,
            normals,
        });

        if let Some(Slot::InFlight(marker)) = entries.insert(source, Slot::Ready(result.clone())) {
            let _ = marker.result.set(result.clone());
        }
        entries.insert(instance_id, Slot::Ready(result.clone()));

        log::debug!(
            "recorded {} smoothed normals for {source} (instance {instance_id})",
            result.vertex_count()
        );
        result
    }

    /// Remove the result stored under `id` and every alias of it.
    ///
    /// Returns `false` if `id` had no ready result.
    pub fn invalidate(&self, id: MeshId) -> bool {
        let mut entries = self.entries.lock();
        let Some(Slot::Ready(result)) = entries.get(&id) else {
            return false;
        };
        let result = result.clone();
        remove_aliases(&mut entries, &result);
        true
    }

    /// Number of identities with a ready result (aliases count separately).
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// True if no identity has a ready result.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn abandon(&self, source: MeshId, marker: &Arc<InFlight>) {
        let mut entries = self.entries.lock();
        // Another request recorded a result in the meantime; waiters have it.
        if marker.result.get().is_some() {
            log::trace!("unused reservation for {source} dropped after a result was recorded");
            return;
        }
        if let Some(Slot::InFlight(current)) = entries.get(&source)
            && Arc::ptr_eq(current, marker)
        {
            entries.remove(&source);
        }
        marker.abandoned.store(true, Ordering::Release);
        log::warn!("computation for {source} abandoned");
    }
}

fn remove_aliases(entries: &mut HashMap<MeshId, Slot>, result: &Arc<SmoothedMesh>) {
    entries.retain(|_, slot| match slot {
        Slot::Ready(other) => !Arc::ptr_eq(other, result),
        Slot::InFlight(_) => true,
    });
}

impl std::fmt::Debug for MeshResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        let in_flight = entries
            .values()
            .filter(|slot| matches!(slot, Slot::InFlight(_)))
            .count();
        f.debug_struct("MeshResultCache")
            .field("ready", &(entries.len() - in_flight))
            .field("in_flight", &in_flight)
            .finish()
    }
}
