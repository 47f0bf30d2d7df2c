//! Single-threaded cooperative reactor.
//!
//! Transport callbacks never run user code directly. They post a job through
//! a [`ReactorHandle`], and the job runs on whichever thread is currently
//! driving the reactor via [`Reactor::drive_until`] or
//! [`SingleThreadedReactor::spin_some`]. Jobs run in the order they were
//! posted.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, ThreadId},
    time::{Duration, Instant},
};

use flume::RecvTimeoutError;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{ParamError, Result};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Why a drive call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    Ready,
    TimedOut,
    ShuttingDown,
}

/// The one capability blocking clients need from a scheduler.
pub trait Reactor: Send + Sync {
    /// Handle used by transports to post completions onto this reactor.
    fn handle(&self) -> ReactorHandle;

    /// Run queued jobs on the calling thread until `ready` returns true, the
    /// timeout elapses, or the reactor shuts down. `None` waits forever, and so
    /// does a timeout too large to be represented as a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::ReentrantDrive`] if the calling thread is already
    /// driving the reactor, e.g. from inside one of its own jobs, and
    /// [`ParamError::ReactorBusy`] if another thread is driving it.
    fn drive_until(
        &self,
        ready: &dyn Fn() -> bool,
        timeout: Option<Duration>,
    ) -> Result<DriveOutcome>;
}

/// Cloneable posting side of a reactor.
#[derive(Clone)]
pub struct ReactorHandle {
    tx: flume::Sender<Job>,
    shutdown: Arc<AtomicBool>,
}

impl ReactorHandle {
    /// Queue `job` to run on the driving thread.
    ///
    /// Returns `false` and drops the job if the reactor has shut down.
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shutdown() {
            trace!("[REACTOR] dropping job posted after shutdown");
            return false;
        }
        self.tx.send(Box::new(job)).is_ok()
    }

    /// Stop the reactor. A thread blocked in a drive call returns
    /// [`DriveOutcome::ShuttingDown`].
    pub fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            debug!("[REACTOR] shutting down");
            // Wake a blocked driver
            let _ = self.tx.send(Box::new(|| {}));
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ReactorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactorHandle")
            .field("queued", &self.tx.len())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Reactor backed by an unbounded FIFO of jobs.
pub struct SingleThreadedReactor {
    tx: flume::Sender<Job>,
    rx: flume::Receiver<Job>,
    shutdown: Arc<AtomicBool>,
    driver: Mutex<Option<ThreadId>>,
    executed: AtomicUsize,
}

impl Default for SingleThreadedReactor {
    fn default() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx,
            rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            driver: Mutex::new(None),
            executed: AtomicUsize::new(0),
        }
    }
}

impl SingleThreadedReactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every job queued right now without waiting for more.
    ///
    /// Returns the number of jobs executed.
    pub fn spin_some(&self) -> Result<usize> {
        let _guard = DriveGuard::enter(&self.driver)?;
        let mut count = 0;
        while let Ok(job) = self.rx.try_recv() {
            self.run(job);
            count += 1;
        }
        Ok(count)
    }

    pub fn shutdown(&self) {
        self.handle().shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Jobs posted but not yet executed.
    pub fn queued_jobs(&self) -> usize {
        self.rx.len()
    }

    /// Jobs executed since creation.
    pub fn executed_jobs(&self) -> usize {
        self.executed.load(Ordering::Acquire)
    }

    fn run(&self, job: Job) {
        trace!("[REACTOR] running job");
        job();
        self.executed.fetch_add(1, Ordering::AcqRel);
    }
}

impl Reactor for SingleThreadedReactor {
    fn handle(&self) -> ReactorHandle {
        ReactorHandle {
            tx: self.tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    fn drive_until(
        &self,
        ready: &dyn Fn() -> bool,
        timeout: Option<Duration>,
    ) -> Result<DriveOutcome> {
        let _guard = DriveGuard::enter(&self.driver)?;
        // Past the representable range means no deadline at all
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            if ready() {
                return Ok(DriveOutcome::Ready);
            }
            if self.is_shutdown() {
                return Ok(DriveOutcome::ShuttingDown);
            }

            let next = match deadline {
                Some(deadline) => self.rx.recv_deadline(deadline),
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match next {
                Ok(job) => self.run(job),
                Err(RecvTimeoutError::Timeout) => {
                    return Ok(if ready() {
                        DriveOutcome::Ready
                    } else {
                        DriveOutcome::TimedOut
                    });
                }
                // Unreachable while `self.tx` is alive
                Err(RecvTimeoutError::Disconnected) => return Ok(DriveOutcome::ShuttingDown),
            }
        }
    }
}

impl fmt::Debug for SingleThreadedReactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleThreadedReactor")
            .field("queued", &self.queued_jobs())
            .field("executed", &self.executed_jobs())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Marks the current thread as the reactor's only driver while alive.
struct DriveGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> DriveGuard<'a> {
    fn enter(driver: &'a Mutex<Option<ThreadId>>) -> Result<Self> {
        let current = thread::current().id();
        let mut slot = driver.lock();
        match *slot {
            Some(id) if id == current => Err(ParamError::ReentrantDrive),
            Some(_) => Err(ParamError::ReactorBusy),
            None => {
                *slot = Some(current);
                Ok(Self(driver))
            }
        }
    }
}

impl Drop for DriveGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_jobs_only_run_when_driven() {
        let reactor = SingleThreadedReactor::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        assert!(reactor.handle().post(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(reactor.queued_jobs(), 1);
        assert_eq!(reactor.spin_some().unwrap(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_jobs_run_in_posting_order() {
        let reactor = SingleThreadedReactor::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let seen = seen.clone();
            reactor.handle().post(move || seen.lock().unwrap().push(i));
        }
        reactor.spin_some().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_drive_until_stops_when_ready() {
        let reactor = SingleThreadedReactor::new();
        let done = Arc::new(AtomicBool::new(false));
        let d = done.clone();
        reactor.handle().post(move || d.store(true, Ordering::SeqCst));
        reactor.handle().post(|| {});

        let outcome = reactor
            .drive_until(&|| done.load(Ordering::SeqCst), Some(Duration::from_secs(1)))
            .unwrap();
        assert_eq!(outcome, DriveOutcome::Ready);
        // The second job was left for a later drive
        assert_eq!(reactor.queued_jobs(), 1);
    }

    #[test]
    fn test_drive_until_times_out() {
        let reactor = SingleThreadedReactor::new();
        let start = Instant::now();
        let outcome = reactor
            .drive_until(&|| false, Some(Duration::from_millis(30)))
            .unwrap();
        assert_eq!(outcome, DriveOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_shutdown_wakes_blocked_driver() {
        let reactor = Arc::new(SingleThreadedReactor::new());
        let handle = reactor.handle();
        let driver = std::thread::spawn({
            let reactor = reactor.clone();
            move || reactor.drive_until(&|| false, None)
        });
        std::thread::sleep(Duration::from_millis(20));
        handle.shutdown();
        assert_eq!(driver.join().unwrap().unwrap(), DriveOutcome::ShuttingDown);
        assert!(!handle.post(|| {}));
    }

    #[test]
    fn test_reentrant_drive_is_rejected() {
        let reactor = Arc::new(SingleThreadedReactor::new());
        let inner_result = Arc::new(Mutex::new(None));
        {
            let reactor2 = reactor.clone();
            let inner_result = inner_result.clone();
            reactor.handle().post(move || {
                let r = reactor2.drive_until(&|| true, Some(Duration::from_millis(1)));
                *inner_result.lock().unwrap() = Some(r);
            });
        }
        reactor.spin_some().unwrap();
        assert_eq!(
            inner_result.lock().unwrap().take(),
            Some(Err(ParamError::ReentrantDrive))
        );
        // The guard is released afterwards
        assert_eq!(
            reactor.drive_until(&|| true, None).unwrap(),
            DriveOutcome::Ready
        );
    }

    #[test]
    fn test_unbounded_timeout_does_not_overflow() {
        let reactor = SingleThreadedReactor::new();
        assert_eq!(
            reactor.drive_until(&|| true, Some(Duration::MAX)).unwrap(),
            DriveOutcome::Ready
        );

        let done = Arc::new(AtomicBool::new(false));
        let d = done.clone();
        reactor.handle().post(move || d.store(true, Ordering::SeqCst));
        assert_eq!(
            reactor
                .drive_until(&|| done.load(Ordering::SeqCst), Some(Duration::MAX))
                .unwrap(),
            DriveOutcome::Ready
        );
    }

    #[test]
    fn test_drive_from_second_thread_is_busy() {
        let reactor = Arc::new(SingleThreadedReactor::new());
        let stop = Arc::new(AtomicBool::new(false));
        let driver = std::thread::spawn({
            let reactor = reactor.clone();
            let stop = stop.clone();
            move || {
                reactor.drive_until(
                    &|| stop.load(Ordering::SeqCst),
                    Some(Duration::from_secs(5)),
                )
            }
        });

        // Once this job has run, the other thread holds the reactor
        let (tx, rx) = flume::bounded(1);
        reactor.handle().post(move || {
            let _ = tx.send(());
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(
            reactor.drive_until(&|| true, None),
            Err(ParamError::ReactorBusy)
        );
        assert_eq!(reactor.spin_some(), Err(ParamError::ReactorBusy));

        stop.store(true, Ordering::SeqCst);
        reactor.handle().post(|| {});
        assert_eq!(driver.join().unwrap().unwrap(), DriveOutcome::Ready);
    }
}
