//!
//! Message bus configuration.
//!

#[cfg(feature = "message-log")]
use std::path::PathBuf;
use std::time::Duration;

/// Default upper bound on how long the dispatcher waits between batches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How the dispatcher waits for the next batch of messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Wake as soon as a message is enqueued; the poll interval only
    /// bounds how long an idle dispatcher sleeps.
    #[default]
    WakeOnEnqueue,
    /// Sleep a full poll interval before every swap, whether or not
    /// anything was enqueued.
    FixedInterval,
}

/// Configuration for a [`crate::MessageBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusConfig {
    /// Upper bound on a single dispatcher wait
    pub poll_interval: Duration,
    /// How the dispatcher waits for work
    pub dispatch_mode: DispatchMode,
    /// Where to write the diagnostic message log, if anywhere
    #[cfg(feature = "message-log")]
    pub message_log: Option<PathBuf>,
}

impl BusConfig {
    /// Set the poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the dispatch mode
    pub fn with_dispatch_mode(mut self, dispatch_mode: DispatchMode) -> Self {
        self.dispatch_mode = dispatch_mode;
        self
    }

    /// Write the diagnostic message log to `path` (truncated when the bus
    /// starts running)
    #[cfg(feature = "message-log")]
    pub fn with_message_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.message_log = Some(path.into());
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            dispatch_mode: DispatchMode::default(),
            #[cfg(feature = "message-log")]
            message_log: None,
        }
    }
}
