use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::math::Vec3;
use crate::profiling::set_thread_name;
use crate::smooth::compute_smooth_normals;

use super::SmoothRunner;
use super::ticket::{SmoothOutcome, SmoothTicket};

/// A queued smoothing job.
struct Job {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    reply: mpsc::Sender<SmoothOutcome>,
}

/// Background thread pool that runs smoothing jobs.
///
/// Jobs only ever see owned copies of the vertex data. Results go back
/// through each job's [`SmoothTicket`], so meshes are only written on the
/// thread that polls the ticket.
///
/// Dropping the worker finishes queued jobs and joins the threads.
///
/// # Example
///
/// ```
/// use meshsmooth_core::compute::{SmoothRunner, SmoothWorker};
/// use meshsmooth_core::math::Vec3;
///
/// let worker = SmoothWorker::new(2).unwrap();
/// let ticket = worker.run(vec![Vec3::zeros(); 2], vec![Vec3::x(), Vec3::y()]);
/// let normals = ticket.recv().unwrap();
/// assert_eq!(normals[0], normals[1]);
/// ```
pub struct SmoothWorker {
    sender: Option<mpsc::Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl SmoothWorker {
    /// Starts a pool with `num_threads` worker threads (at least one).
    pub fn new(num_threads: usize) -> std::io::Result<Self> {
        let num_threads = num_threads.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut threads = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let receiver = receiver.clone();
            let in_flight = in_flight.clone();
            let thread = std::thread::Builder::new()
                .name(format!("smooth-worker-{index}"))
                .spawn(move || worker_loop(&receiver, &in_flight))?;
            threads.push(thread);
        }

        log::debug!("started smoothing worker with {num_threads} threads");
        Ok(Self {
            sender: Some(sender),
            threads,
            in_flight,
        })
    }

    /// Starts a pool sized to the number of available CPU cores.
    pub fn default_threads() -> std::io::Result<Self> {
        Self::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Number of jobs submitted but not yet finished.
    pub fn pending_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

fn worker_loop(receiver: &Mutex<mpsc::Receiver<Job>>, in_flight: &AtomicUsize) {
    set_thread_name!("smooth-worker");
    loop {
        // Hold the lock only while dequeuing.
        let job = receiver.lock().recv();
        let Ok(job) = job else {
            break;
        };
        let outcome = compute_smooth_normals(&job.positions, &job.normals);
        in_flight.fetch_sub(1, Ordering::AcqRel);
        // The requester may have gone away; nothing to deliver then.
        let _ = job.reply.send(outcome);
    }
}

impl SmoothRunner for SmoothWorker {
    fn run(&self, positions: Vec<Vec3>, normals: Vec<Vec3>) -> SmoothTicket {
        let (reply, ticket) = SmoothTicket::channel();
        let Some(sender) = &self.sender else {
            return ticket;
        };

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let job = Job {
            positions,
            normals,
            reply,
        };
        if sender.send(job).is_err() {
            // Every thread is gone; the dropped reply surfaces as a disconnect.
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            log::warn!("smoothing worker has no live threads, job dropped");
        }
        ticket
    }
}

impl Drop for SmoothWorker {
    fn drop(&mut self) {
        self.sender.take();
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                log::error!("smoothing worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smooth::SmoothError;

    #[test]
    fn at_least_one_thread() {
        let worker = SmoothWorker::new(0).unwrap();
        assert_eq!(worker.thread_count(), 1);
    }

    #[test]
    fn runs_many_jobs() {
        let worker = SmoothWorker::new(3).unwrap();
        let tickets: Vec<_> = (0..16)
            .map(|i| {
                let p = Vec3::new(i as f32, 0.0, 0.0);
                worker.run(vec![p, p], vec![Vec3::x(), Vec3::z()])
            })
            .collect();

        let expected = Vec3::new(1.0, 0.0, 1.0).normalize();
        for ticket in tickets {
            let normals = ticket.recv().unwrap();
            assert!((normals[0] - expected).norm() < 1e-6);
            assert_eq!(normals[0], normals[1]);
        }
        assert_eq!(worker.pending_count(), 0);
    }

    #[test]
    fn errors_are_delivered() {
        let worker = SmoothWorker::new(1).unwrap();
        let ticket = worker.run(vec![Vec3::zeros(); 2], vec![Vec3::x()]);
        assert_eq!(
            ticket.recv(),
            Err(SmoothError::LengthMismatch {
                positions: 2,
                normals: 1
            })
        );
    }

    #[test]
    fn drop_finishes_queued_jobs() {
        let worker = SmoothWorker::new(1).unwrap();
        let ticket = worker.run(vec![Vec3::zeros()], vec![Vec3::y()]);
        drop(worker);
        assert_eq!(ticket.recv(), Ok(vec![Vec3::y()]));
    }
}
