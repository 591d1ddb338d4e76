//!
//! The worker thread behind an Active Node.
//!
//! A [`NodeThread`] owns at most one running worker.  The worker calls the
//! node's loop body, then waits out the rest of the loop period on a stop
//! channel, so a stop request interrupts the wait instead of waiting a
//! full period for the loop to come back around.
//!

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};

use sailbus_core::{LifecycleError, NodeId};
use sailbus_utils::Timer;

/// A loop period that can be changed while the worker is running.
///
/// Clones share the same value, so the node keeps one copy to update from
/// `update_configs` and hands another to its worker.
#[derive(Debug, Clone)]
pub struct LoopPeriod(Arc<AtomicU64>);

impl LoopPeriod {
    /// Create a new loop period
    pub fn new(period: Duration) -> Self {
        Self(Arc::new(AtomicU64::new(Self::micros(period))))
    }

    /// The current period
    pub fn get(&self) -> Duration {
        Duration::from_micros(self.0.load(Ordering::Relaxed))
    }

    /// Change the period, taking effect from the next iteration
    pub fn set(&self, period: Duration) {
        self.0.store(Self::micros(period), Ordering::Relaxed);
    }

    fn micros(period: Duration) -> u64 {
        u64::try_from(period.as_micros()).unwrap_or(u64::MAX)
    }
}

struct Worker {
    handle: JoinHandle<()>,
    stop: Sender<()>,
}

/// Start/stop bookkeeping for a single worker thread.
pub struct NodeThread {
    id: NodeId,
    worker: Mutex<Option<Worker>>,
}

impl NodeThread {
    /// Create an idle NodeThread for the node `id`
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            worker: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the worker, calling `body` once every `period`.
    ///
    /// Fails with [`LifecycleError::AlreadyRunning`] if a worker is still
    /// running, in which case that worker is left alone.
    pub fn start<F>(&self, period: LoopPeriod, mut body: F) -> Result<(), LifecycleError>
    where
        F: FnMut() + Send + 'static,
    {
        let mut worker = self.lock();
        if let Some(running) = worker.as_ref() {
            if !running.handle.is_finished() {
                log::error!("{} is already running, ignoring start request", self.id);
                return Err(LifecycleError::AlreadyRunning(self.id));
            }
        }
        // Reap a worker that exited on its own, by panicking or by stopping itself
        if let Some(finished) = worker.take() {
            join(self.id, finished.handle);
        }

        let (stop_tx, stop_rx) = bounded(1);
        let id = self.id;
        let handle = thread::Builder::new()
            .name(id.name().to_string())
            .spawn(move || {
                log::debug!("{} worker started", id);
                let mut timer = Timer::new();
                loop {
                    timer.reset();
                    body();
                    match stop_rx.recv_timeout(timer.time_until(period.get())) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("{} worker stopped", id);
            })
            .map_err(|source| LifecycleError::Spawn { node: id, source })?;

        *worker = Some(Worker {
            handle,
            stop: stop_tx,
        });
        Ok(())
    }

    /// Signal the worker to stop and wait for it to exit.
    ///
    /// Does nothing if no worker was started.
    ///
    /// Called from the worker itself, this only signals: the worker stays
    /// tracked until its loop exits, so a `start` in the meantime still
    /// fails with [`LifecycleError::AlreadyRunning`].
    pub fn stop(&self) {
        let mut slot = self.lock();
        let Some(worker) = slot.as_ref() else {
            return;
        };
        // Full means a stop is already pending, disconnected means the
        // worker is gone; neither needs another signal
        let _ = worker.stop.try_send(());
        if worker.handle.thread().id() == thread::current().id() {
            log::debug!("{} worker asked itself to stop", self.id);
            return;
        }

        let Some(worker) = slot.take() else {
            return;
        };
        drop(slot);
        join(self.id, worker.handle);
    }

    /// Whether a worker is currently running
    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }
}

impl Drop for NodeThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join(id: NodeId, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        log::error!("{} worker thread panicked", id);
    }
}
