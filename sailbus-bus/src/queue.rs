//!
//! The producer-facing half of the double-buffered message queue.
//!
//! Producers push onto the front queue under a mutex that is held only for
//! the push.  The dispatcher swaps the whole front queue with its own
//! drained back queue in one step, so producers are never blocked while a
//! batch is being delivered.
//!

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::Duration,
};

#[cfg(feature = "message-log")]
use chrono::{DateTime, Utc};

use sailbus_core::Message;

use crate::config::DispatchMode;

/// A queued message together with the instant it was sent
#[derive(Debug)]
pub(crate) struct Envelope {
    pub message: Message,
    #[cfg(feature = "message-log")]
    pub received: DateTime<Utc>,
}

impl Envelope {
    fn new(message: Message) -> Self {
        Self {
            message,
            #[cfg(feature = "message-log")]
            received: Utc::now(),
        }
    }
}

/// State shared between the bus, its handles, and the dispatcher
#[derive(Debug, Default)]
pub(crate) struct FrontQueue {
    queue: Mutex<VecDeque<Envelope>>,
    wake: Condvar,
    stop_requested: AtomicBool,
}

impl FrontQueue {
    fn lock(&self) -> MutexGuard<'_, VecDeque<Envelope>> {
        // Nothing panics while the lock is held so the data is never torn
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a message and wake the dispatcher
    pub fn push(&self, message: Message) {
        let envelope = Envelope::new(message);
        self.lock().push_back(envelope);
        self.wake.notify_one();
    }

    /// Number of messages waiting for the next swap
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Ask the dispatcher to stop and wake it if it is waiting
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        // Taking the lock orders the flag before a waiter re-checks it
        let _queue = self.lock();
        self.wake.notify_all();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait for work, then move everything enqueued so far into `back`.
    ///
    /// `back` must be empty; the front queue is left holding its (empty)
    /// storage so the two buffers trade places.
    pub fn wait_and_swap(
        &self,
        back: &mut VecDeque<Envelope>,
        mode: DispatchMode,
        poll_interval: Duration,
    ) {
        let queue = match mode {
            DispatchMode::FixedInterval => {
                thread::sleep(poll_interval);
                self.lock()
            }
            DispatchMode::WakeOnEnqueue => {
                let queue = self.lock();
                self.wake
                    .wait_timeout_while(queue, poll_interval, |queue| {
                        queue.is_empty() && !self.is_stop_requested()
                    })
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        Self::swap(queue, back);
    }

    /// Move everything enqueued so far into `back` without waiting
    pub fn swap_now(&self, back: &mut VecDeque<Envelope>) {
        Self::swap(self.lock(), back);
    }

    fn swap(mut queue: MutexGuard<'_, VecDeque<Envelope>>, back: &mut VecDeque<Envelope>) {
        debug_assert!(back.is_empty());
        if !queue.is_empty() {
            std::mem::swap(&mut *queue, back);
        }
    }
}
