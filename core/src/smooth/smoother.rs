//! Per-entity smoothing orchestration.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::compute::{SmoothRunner, SmoothTicket};
use crate::math::Vec3;
use crate::mesh::{ChannelSink, MAX_UV_CHANNELS, MeshHandle};

use super::cache::{Acquire, InFlight, MeshResultCache, Reservation, SmoothedMesh};
use super::error::SmoothError;
use super::normals::compute_smooth_normals;

/// UV channel that receives smoothed normals unless configured otherwise.
pub const DEFAULT_SMOOTH_NORMAL_CHANNEL: usize = 2;

/// Configuration for a [`MeshSmoother`].
///
/// # Example
///
/// ```
/// use meshsmooth_core::smooth::SmootherConfig;
///
/// let config = SmootherConfig::new()
///     .with_smooth_on_load(true)
///     .with_uv_channel(3);
/// assert!(config.smooth_on_load);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmootherConfig {
    /// Start an asynchronous request as soon as the smoother is loaded.
    pub smooth_on_load: bool,
    /// Channel the smoothed normals are written to.
    pub uv_channel: usize,
}

impl SmootherConfig {
    /// Default configuration: on demand, channel 2.
    pub fn new() -> Self {
        Self {
            smooth_on_load: false,
            uv_channel: DEFAULT_SMOOTH_NORMAL_CHANNEL,
        }
    }

    /// Set whether to smooth on load.
    pub fn with_smooth_on_load(mut self, smooth_on_load: bool) -> Self {
        self.smooth_on_load = smooth_on_load;
        self
    }

    /// Set the output channel.
    pub fn with_uv_channel(mut self, uv_channel: usize) -> Self {
        self.uv_channel = uv_channel;
        self
    }
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of a [`MeshSmoother`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmoothState {
    /// No result yet and nothing pending.
    Unprocessed,
    /// A request is pending; call [`MeshSmoother::poll`].
    Computing,
    /// The smoothed mesh is in place.
    Applied,
}

/// Answer to [`MeshSmoother::smooth_normals_async`].
#[derive(Debug)]
pub enum SmoothRequest {
    /// The result was available and has been applied.
    Immediate(Arc<SmoothedMesh>),
    /// The result will be applied by a later [`MeshSmoother::poll`].
    Pending,
}

enum Pending {
    /// This smoother owns the computation.
    Computing {
        ticket: SmoothTicket,
        instance: MeshHandle,
        reservation: Reservation,
    },
    /// Another request is computing the same source.
    Waiting(Arc<InFlight>),
}

/// Smooths the normals of one mesh-owning entity.
///
/// The smoother starts out pointing at the shared mesh asset. Once smoothed
/// it points at a per-instance copy whose UV channel holds the smoothed
/// normals; every smoother of the same asset ends up on the same copy,
/// through the shared [`MeshResultCache`].
///
/// Results computed off-thread are applied only inside [`poll`](Self::poll),
/// on the thread that owns the smoother.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use meshsmooth_core::compute::SmoothWorker;
/// use meshsmooth_core::mesh::{MeshHandle, generators::generate_cube};
/// use meshsmooth_core::smooth::{MeshResultCache, MeshSmoother, SmoothState, SmootherConfig};
///
/// let cache = Arc::new(MeshResultCache::new());
/// let worker = SmoothWorker::new(1).unwrap();
/// let cube = MeshHandle::new(generate_cube(0.5));
///
/// let mut smoother = MeshSmoother::new(cache.clone(), cube.clone(), SmootherConfig::new());
/// smoother.smooth_normals_async(&worker).unwrap();
/// let result = smoother.wait().unwrap().unwrap();
///
/// assert_eq!(smoother.state(), SmoothState::Applied);
/// assert!(Arc::ptr_eq(&cache.try_get(cube.id()).unwrap(), &result));
/// ```
pub struct MeshSmoother {
    cache: Arc<MeshResultCache>,
    shared: MeshHandle,
    current: MeshHandle,
    config: SmootherConfig,
    state: SmoothState,
    pending: Option<Pending>,
    result: Option<Arc<SmoothedMesh>>,
}

impl MeshSmoother {
    /// Creates a smoother for `shared` without starting any work.
    pub fn new(cache: Arc<MeshResultCache>, shared: MeshHandle, config: SmootherConfig) -> Self {
        Self {
            cache,
            current: shared.clone(),
            shared,
            config,
            state: SmoothState::Unprocessed,
            pending: None,
            result: None,
        }
    }

    /// Creates a smoother and, if [`SmootherConfig::smooth_on_load`] is set,
    /// issues an asynchronous request on `runner` right away.
    pub fn load(
        cache: Arc<MeshResultCache>,
        shared: MeshHandle,
        config: SmootherConfig,
        runner: &impl SmoothRunner,
    ) -> Result<Self, SmoothError> {
        let mut smoother = Self::new(cache, shared, config);
        if config.smooth_on_load {
            smoother.smooth_normals_async(runner)?;
        }
        Ok(smoother)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SmoothState {
        self.state
    }

    /// The mesh this entity currently renders: the shared asset until a
    /// result is applied, then the smoothed instance.
    pub fn mesh(&self) -> &MeshHandle {
        &self.current
    }

    /// The shared source asset.
    pub fn shared_mesh(&self) -> &MeshHandle {
        &self.shared
    }

    /// The configuration.
    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// The applied result, if any.
    pub fn result(&self) -> Option<&Arc<SmoothedMesh>> {
        self.result.as_ref()
    }

    /// Smooth on the calling thread.
    ///
    /// Uses the cached result when there is one. If another request for the
    /// same asset is still in flight, computes anyway and records first; the
    /// other request then adopts this result.
    pub fn smooth_normals(&mut self) -> Result<Arc<SmoothedMesh>, SmoothError> {
        if let Some(result) = self.applied() {
            return Ok(result);
        }

        match self.pending.take() {
            Some(Pending::Computing {
                mut ticket,
                instance,
                reservation,
            }) => {
                ticket.wait_ready();
                self.pending = Some(Pending::Computing {
                    ticket,
                    instance,
                    reservation,
                });
                return self
                    .poll()
                    .unwrap_or(Err(SmoothError::WorkerDisconnected));
            }
            Some(Pending::Waiting(marker)) => {
                if let Some(result) = marker.get() {
                    return self.adopt(result);
                }
            }
            None => {}
        }

        if let Err(err) = self.check_channel() {
            self.state = SmoothState::Unprocessed;
            return Err(err);
        }

        let vertex_count = self.shared.read().vertex_count();
        let outcome = match self.cache.acquire(self.shared.id(), vertex_count) {
            Acquire::Hit(result) => Ok(result),
            Acquire::Wait(_) => self
                .compute_inline()
                .map(|(instance, normals)| self.cache.record(self.shared.id(), instance, normals)),
            Acquire::Compute(reservation) => self
                .compute_inline()
                .map(|(instance, normals)| reservation.fulfill(instance, normals)),
        };

        match outcome {
            Ok(result) => self.adopt(result),
            Err(err) => {
                self.state = SmoothState::Unprocessed;
                Err(err)
            }
        }
    }

    /// Request smoothing without blocking on the computation.
    ///
    /// On a cache hit the result is applied immediately. Otherwise the vertex
    /// data is copied and submitted to `runner`, or, if the asset is already
    /// being computed, this smoother waits for that computation. Either way
    /// the result is applied by a later [`poll`](Self::poll).
    ///
    /// Calling this again while a request is pending does not submit again.
    pub fn smooth_normals_async(
        &mut self,
        runner: &impl SmoothRunner,
    ) -> Result<SmoothRequest, SmoothError> {
        if let Some(result) = self.applied() {
            return Ok(SmoothRequest::Immediate(result));
        }
        if self.pending.is_some() {
            return Ok(SmoothRequest::Pending);
        }
        self.check_channel()?;

        let vertex_count = self.shared.read().vertex_count();
        match self.cache.acquire(self.shared.id(), vertex_count) {
            Acquire::Hit(result) => Ok(SmoothRequest::Immediate(self.adopt(result)?)),
            Acquire::Wait(marker) => {
                log::trace!("{} waits on an in-flight computation", self.shared.id());
                self.pending = Some(Pending::Waiting(marker));
                self.state = SmoothState::Computing;
                Ok(SmoothRequest::Pending)
            }
            Acquire::Compute(reservation) => {
                let instance = self.shared.instantiate();
                // Snapshot the copy so the job matches the mesh it is applied to.
                let (positions, normals) = {
                    let mesh = instance.read();
                    (mesh.positions().to_vec(), mesh.normals().to_vec())
                };
                log::trace!(
                    "submitting {} vertices of {} for smoothing",
                    positions.len(),
                    self.shared.id()
                );
                let ticket = runner.run(positions, normals);
                self.pending = Some(Pending::Computing {
                    ticket,
                    instance,
                    reservation,
                });
                self.state = SmoothState::Computing;
                Ok(SmoothRequest::Pending)
            }
        }
    }

    /// Apply a finished request. Call on the thread that owns this smoother.
    ///
    /// Returns `None` while the request is still running or if nothing was
    /// requested, and the applied result (or the failure) otherwise. Once
    /// applied, keeps returning the result.
    ///
    /// On failure the smoother goes back to [`SmoothState::Unprocessed`] and
    /// can be asked again.
    pub fn poll(&mut self) -> Option<Result<Arc<SmoothedMesh>, SmoothError>> {
        let Some(pending) = self.pending.take() else {
            return self.applied().map(Ok);
        };

        match pending {
            Pending::Computing {
                mut ticket,
                instance,
                reservation,
            } => match ticket.try_recv() {
                None => {
                    self.pending = Some(Pending::Computing {
                        ticket,
                        instance,
                        reservation,
                    });
                    None
                }
                Some(Ok(normals)) => Some(self.apply(instance, reservation, normals)),
                Some(Err(err)) => {
                    log::warn!("smoothing {} failed: {err}", self.shared.id());
                    self.state = SmoothState::Unprocessed;
                    Some(Err(err))
                }
            },
            Pending::Waiting(marker) => {
                if let Some(result) = marker.get() {
                    Some(self.adopt(result))
                } else if marker.is_abandoned() {
                    self.state = SmoothState::Unprocessed;
                    Some(Err(SmoothError::Abandoned))
                } else {
                    self.pending = Some(Pending::Waiting(marker));
                    None
                }
            }
        }
    }

    /// Block the calling thread until the pending request is applied.
    ///
    /// Returns `None` if nothing was requested. A smoother waiting on another
    /// smoother's computation would otherwise depend on that smoother being
    /// polled, so it computes inline instead.
    pub fn wait(&mut self) -> Option<Result<Arc<SmoothedMesh>, SmoothError>> {
        loop {
            if let Some(outcome) = self.poll() {
                return Some(outcome);
            }
            match &mut self.pending {
                Some(Pending::Computing { ticket, .. }) => ticket.wait_ready(),
                Some(Pending::Waiting(_)) => return Some(self.smooth_normals()),
                None => return None,
            }
        }
    }

    /// A future resolving once the pending request is applied.
    ///
    /// Polling the future polls the smoother, so it must be driven on the
    /// owning thread. Resolves to `None` if nothing was requested.
    pub fn completion(&mut self) -> Completion<'_> {
        Completion { smoother: self }
    }

    fn applied(&self) -> Option<Arc<SmoothedMesh>> {
        match (self.state, &self.result) {
            (SmoothState::Applied, Some(result)) => Some(result.clone()),
            _ => None,
        }
    }

    fn check_channel(&self) -> Result<(), SmoothError> {
        if self.config.uv_channel >= MAX_UV_CHANNELS {
            return Err(SmoothError::InvalidChannel {
                channel: self.config.uv_channel,
                max: MAX_UV_CHANNELS,
            });
        }
        Ok(())
    }

    /// Switch to `result`, publishing its normals on this smoother's channel
    /// if whoever computed it wrote a different one.
    fn adopt(&mut self, result: Arc<SmoothedMesh>) -> Result<Arc<SmoothedMesh>, SmoothError> {
        let channel = self.config.uv_channel;
        let written = self.check_channel().and_then(|()| {
            if result.mesh().read().uv_channel(channel).is_some() {
                return Ok(());
            }
            log::trace!("copying smoothed normals of {} to channel {channel}", result.mesh().id());
            result
                .mesh()
                .write()
                .set_channel(channel, result.normals().to_vec())
        });
        if let Err(err) = written {
            self.pending = None;
            self.state = SmoothState::Unprocessed;
            return Err(err);
        }

        self.current = result.mesh().clone();
        self.result = Some(result.clone());
        self.pending = None;
        self.state = SmoothState::Applied;
        log::trace!("{} now renders {}", self.shared.id(), self.current.id());
        Ok(result)
    }

    fn apply(
        &mut self,
        instance: MeshHandle,
        reservation: Reservation,
        normals: Vec<Vec3>,
    ) -> Result<Arc<SmoothedMesh>, SmoothError> {
        let shared_normals: Arc<[Vec3]> = Arc::from(normals.as_slice());
        if let Err(err) = instance.write().set_channel(self.config.uv_channel, normals) {
            self.state = SmoothState::Unprocessed;
            return Err(err);
        }
        let result = reservation.fulfill(instance, shared_normals);
        self.adopt(result)
    }

    fn compute_inline(&self) -> Result<(MeshHandle, Arc<[Vec3]>), SmoothError> {
        let instance = self.shared.instantiate();
        let normals = {
            let mesh = instance.read();
            compute_smooth_normals(mesh.positions(), mesh.normals())?
        };
        let shared_normals: Arc<[Vec3]> = Arc::from(normals.as_slice());
        instance.write().set_channel(self.config.uv_channel, normals)?;
        Ok((instance, shared_normals))
    }
}

impl std::fmt::Debug for MeshSmoother {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshSmoother")
            .field("shared", &self.shared.id())
            .field("current", &self.current.id())
            .field("state", &self.state)
            .field("config", &self.config)
            .finish()
    }
}

/// Future returned by [`MeshSmoother::completion`].
pub struct Completion<'a> {
    smoother: &'a mut MeshSmoother,
}

impl Future for Completion<'_> {
    type Output = Option<Result<Arc<SmoothedMesh>, SmoothError>>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let smoother = &mut *self.smoother;
        match smoother.poll() {
            Some(outcome) => Poll::Ready(Some(outcome)),
            None if smoother.pending.is_none() => Poll::Ready(None),
            None => Poll::Pending,
        }
    }
}
