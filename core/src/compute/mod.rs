//! Execution of smoothing jobs.
//!
//! - [`SmoothRunner`]: Trait for anything that can run a smoothing job
//! - [`SmoothTicket`]: Channel-based handle for a job's result
//! - [`SmoothWorker`]: Background thread pool
//! - [`InlineRunner`]: Runs the job on the calling thread

mod ticket;
mod worker;

pub use ticket::{SmoothOutcome, SmoothTicket};
pub use worker::SmoothWorker;

use crate::math::Vec3;
use crate::smooth::compute_smooth_normals;

/// Trait for running smoothing jobs.
///
/// The runner receives owned copies of the vertex data and answers through a
/// [`SmoothTicket`]. It never touches the mesh itself; applying the result is
/// left to whoever polls the ticket.
///
/// # Implementors
///
/// - [`SmoothWorker`] (background threads)
/// - [`InlineRunner`] (calling thread, ticket is ready on return)
pub trait SmoothRunner: Send + Sync {
    /// Submits a job computing smoothed normals for the given buffers.
    fn run(&self, positions: Vec<Vec3>, normals: Vec<Vec3>) -> SmoothTicket;
}

/// Runs jobs immediately on the calling thread.
///
/// Useful where threads are unavailable and in tests; the returned ticket
/// already holds the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRunner;

impl SmoothRunner for InlineRunner {
    fn run(&self, positions: Vec<Vec3>, normals: Vec<Vec3>) -> SmoothTicket {
        let (reply, ticket) = SmoothTicket::channel();
        let _ = reply.send(compute_smooth_normals(&positions, &normals));
        ticket
    }
}
