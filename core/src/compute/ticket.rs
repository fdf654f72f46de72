use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc;
use std::task::{Context, Poll};

use crate::math::Vec3;
use crate::smooth::SmoothError;

/// Result delivered by a smoothing job.
pub type SmoothOutcome = Result<Vec<Vec3>, SmoothError>;

/// Handle to a smoothing job running on a [`SmoothRunner`](super::SmoothRunner).
///
/// The job's result travels back through a channel, so the thread that owns
/// the output mesh decides when to pick it up. Works with cooperative
/// executors using noop wakers: polling only checks the channel.
///
/// A runner that goes away without answering yields
/// [`SmoothError::WorkerDisconnected`].
///
/// # Example
///
/// ```
/// use meshsmooth_core::compute::{InlineRunner, SmoothRunner};
/// use meshsmooth_core::math::Vec3;
///
/// let mut ticket = InlineRunner.run(vec![Vec3::zeros(); 2], vec![Vec3::x(), Vec3::y()]);
/// let normals = ticket.try_recv().unwrap().unwrap();
/// assert_eq!(normals[0], normals[1]);
/// ```
pub struct SmoothTicket {
    receiver: mpsc::Receiver<SmoothOutcome>,
    ready: Option<SmoothOutcome>,
}

impl SmoothTicket {
    /// Creates a connected sender / ticket pair.
    pub fn channel() -> (mpsc::Sender<SmoothOutcome>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver,
                ready: None,
            },
        )
    }

    /// Attempts to retrieve the result without blocking.
    ///
    /// Returns `None` while the job is still running. The result is handed
    /// out once.
    pub fn try_recv(&mut self) -> Option<SmoothOutcome> {
        if let Some(outcome) = self.ready.take() {
            return Some(outcome);
        }
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(SmoothError::WorkerDisconnected)),
        }
    }

    /// Blocks until the result is available, without consuming it.
    ///
    /// The next [`try_recv`](Self::try_recv) returns the result.
    pub fn wait_ready(&mut self) {
        if self.ready.is_none() {
            self.ready = Some(
                self.receiver
                    .recv()
                    .unwrap_or(Err(SmoothError::WorkerDisconnected)),
            );
        }
    }

    /// Blocks until the job completes and returns the result.
    ///
    /// # Warning
    ///
    /// This blocks the calling thread. Prefer `try_recv()` in frame loops.
    pub fn recv(mut self) -> SmoothOutcome {
        self.wait_ready();
        self.ready
            .take()
            .unwrap_or(Err(SmoothError::WorkerDisconnected))
    }
}

impl Future for SmoothTicket {
    type Output = SmoothOutcome;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<SmoothOutcome> {
        match self.try_recv() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::{RawWaker, RawWakerVTable, Waker};

    fn noop_waker() -> Waker {
        fn noop(_: *const ()) {}
        fn clone(p: *const ()) -> RawWaker {
            RawWaker::new(p, &VTABLE)
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
    }

    #[test]
    fn try_recv_empty() {
        let (_tx, mut ticket) = SmoothTicket::channel();
        assert!(ticket.try_recv().is_none());
    }

    #[test]
    fn try_recv_ready() {
        let (tx, mut ticket) = SmoothTicket::channel();
        tx.send(Ok(vec![Vec3::x()])).unwrap();
        assert_eq!(ticket.try_recv(), Some(Ok(vec![Vec3::x()])));
    }

    #[test]
    fn try_recv_disconnected() {
        let (tx, mut ticket) = SmoothTicket::channel();
        drop(tx);
        assert_eq!(
            ticket.try_recv(),
            Some(Err(SmoothError::WorkerDisconnected))
        );
    }

    #[test]
    fn wait_ready_keeps_result() {
        let (tx, mut ticket) = SmoothTicket::channel();
        let handle = std::thread::spawn(move || {
            tx.send(Ok(vec![Vec3::y(); 2])).unwrap();
        });
        ticket.wait_ready();
        handle.join().unwrap();
        assert_eq!(ticket.try_recv(), Some(Ok(vec![Vec3::y(); 2])));
    }

    #[test]
    fn recv_blocks() {
        let (tx, ticket) = SmoothTicket::channel();
        tx.send(Ok(Vec::new())).unwrap();
        assert_eq!(ticket.recv(), Ok(Vec::new()));
    }

    #[test]
    fn future_pending_then_ready() {
        let (tx, mut ticket) = SmoothTicket::channel();

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        assert!(Pin::new(&mut ticket).poll(&mut cx).is_pending());

        tx.send(Ok(vec![Vec3::z()])).unwrap();

        match Pin::new(&mut ticket).poll(&mut cx) {
            Poll::Ready(Ok(normals)) => assert_eq!(normals, vec![Vec3::z()]),
            other => panic!("Expected Ready(Ok(..)), got {other:?}"),
        }
    }
}
