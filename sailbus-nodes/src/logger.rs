//!
//! An Active Node that records the messages it receives.
//!
//! Messages are buffered on the dispatcher thread and written to a
//! [`LogStore`] in batches by the node's worker, so slow storage never
//! holds up dispatch.  Whatever is still buffered is written when the
//! node stops.
//!

use std::{
    mem,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};

use sailbus_core::{
    ActiveNode, LifecycleError, Message, MessageType, Node, NodeError, NodeId, Payload,
};

use crate::{
    config::ConfigSource,
    thread::{LoopPeriod, NodeThread},
};

/// One logged message
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// When the logger received the message
    pub logged_at: DateTime<Utc>,
    /// The message's type
    pub message_type: MessageType,
    /// The node that sent it
    pub source: NodeId,
    /// The message's data, if it carried any
    pub payload: Option<Payload>,
}

impl LogEntry {
    fn now(message: &Message) -> Self {
        Self {
            logged_at: Utc::now(),
            message_type: message.message_type(),
            source: message.source(),
            payload: message.payload().cloned(),
        }
    }
}

/// Where a [`LoggerNode`] writes its entries.
pub trait LogStore: Send + 'static {
    /// Prepare the store.  Called once from `init`.
    fn open(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Persist a batch of entries, oldest first
    fn store(&mut self, entries: &[LogEntry]) -> Result<(), NodeError>;
}

struct Recorder<L> {
    id: NodeId,
    store: Mutex<L>,
    pending: Mutex<Vec<LogEntry>>,
    queue_size: AtomicUsize,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<L: LogStore> Recorder<L> {
    fn record(&self, message: &Message) {
        relock(&self.pending).push(LogEntry::now(message));
    }

    fn flush_if_full(&self) {
        let queue_size = self.queue_size.load(Ordering::Relaxed);
        let batch = {
            let mut pending = relock(&self.pending);
            if pending.len() < queue_size {
                return;
            }
            mem::take(&mut *pending)
        };
        self.write(batch);
    }

    fn flush(&self) {
        let batch = mem::take(&mut *relock(&self.pending));
        if !batch.is_empty() {
            self.write(batch);
        }
    }

    fn write(&self, batch: Vec<LogEntry>) {
        if let Err(err) = relock(&self.store).store(&batch) {
            log::warn!("{}: dropped {} log entries: {}", self.id, batch.len(), err);
        }
    }
}

/// Logs every message it is registered for.
///
/// Register it for the message types worth keeping.  A
/// `ServerConfigsReceived` message refreshes its configuration instead of
/// being logged.
pub struct LoggerNode<L: LogStore> {
    recorder: Arc<Recorder<L>>,
    period: LoopPeriod,
    config: Option<Arc<dyn ConfigSource>>,
    thread: NodeThread,
}

impl<L: LogStore> LoggerNode<L> {
    /// Create a logger that writes to `store` in batches of `queue_size`,
    /// checking whether a batch is ready every `loop_time`
    pub fn new(store: L, queue_size: usize, loop_time: Duration) -> Self {
        let id = NodeId::DbLogger;
        Self {
            recorder: Arc::new(Recorder {
                id,
                store: Mutex::new(store),
                pending: Mutex::new(Vec::new()),
                queue_size: AtomicUsize::new(queue_size.max(1)),
            }),
            period: LoopPeriod::new(loop_time),
            config: None,
            thread: NodeThread::new(id),
        }
    }

    /// Read the loop time and queue size from `config`
    pub fn with_config(mut self, config: Arc<dyn ConfigSource>) -> Self {
        self.config = Some(config);
        self
    }

    /// The number of entries waiting to be written
    pub fn pending(&self) -> usize {
        relock(&self.recorder.pending).len()
    }

    /// The batch size
    pub fn queue_size(&self) -> usize {
        self.recorder.queue_size.load(Ordering::Relaxed)
    }

    /// Write every buffered entry now
    pub fn flush(&self) {
        self.recorder.flush();
    }
}

impl<L: LogStore> Node for LoggerNode<L> {
    fn id(&self) -> NodeId {
        self.recorder.id
    }

    fn init(&self) -> Result<(), NodeError> {
        relock(&self.recorder.store).open()?;
        self.update_configs();
        Ok(())
    }

    fn process_message(&self, message: &Message) {
        if message.message_type() == MessageType::ServerConfigsReceived {
            self.update_configs();
        } else {
            self.recorder.record(message);
        }
    }

    fn update_configs(&self) {
        let Some(config) = &self.config else {
            return;
        };
        if let Some(loop_time) = config.loop_time(self.id()) {
            self.period.set(loop_time);
        }
        if let Some(queue_size) = config.log_queue_size() {
            self.recorder
                .queue_size
                .store(queue_size.max(1), Ordering::Relaxed);
        }
    }

    fn is_active_node(&self) -> bool {
        true
    }
}

impl<L: LogStore> ActiveNode for LoggerNode<L> {
    fn start(&self) -> Result<(), LifecycleError> {
        let recorder = self.recorder.clone();
        self.thread
            .start(self.period.clone(), move || recorder.flush_if_full())
    }

    fn stop(&self) {
        self.thread.stop();
        self.recorder.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use crate::config::StaticConfig;

    /// Keeps every batch it is given
    #[derive(Clone, Default)]
    struct MemoryStore {
        batches: Arc<Mutex<Vec<Vec<LogEntry>>>>,
    }

    impl MemoryStore {
        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().iter().map(Vec::len).collect()
        }
    }

    impl LogStore for MemoryStore {
        fn store(&mut self, entries: &[LogEntry]) -> Result<(), NodeError> {
            self.batches.lock().unwrap().push(entries.to_vec());
            Ok(())
        }
    }

    struct FullDisk;

    impl LogStore for FullDisk {
        fn store(&mut self, _entries: &[LogEntry]) -> Result<(), NodeError> {
            Err(NodeError::Io(std::io::Error::other("no space left on device")))
        }
    }

    fn rudder(angle: f32) -> Message {
        Message::with_payload(
            Payload::RudderCommand { angle },
            NodeId::CourseRegulator,
            NodeId::None,
        )
    }

    #[test]
    fn test_entries_are_written_in_batches() {
        let store = MemoryStore::default();
        let logger = LoggerNode::new(store.clone(), 3, Duration::from_millis(1));
        logger.start().unwrap();

        for i in 0..7 {
            logger.process_message(&rudder(i as f32));
            if i % 3 == 2 {
                while logger.pending() != 0 {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
        logger.stop();

        assert_eq!(store.batch_sizes(), vec![3, 3, 1]);
        let batches = store.batches.lock().unwrap();
        let first = &batches[0][0];
        assert_eq!(first.message_type, MessageType::RudderCommand);
        assert_eq!(first.source, NodeId::CourseRegulator);
        assert_eq!(first.payload, Some(Payload::RudderCommand { angle: 0.0 }));
    }

    #[test]
    fn test_stop_flushes_a_partial_batch() {
        let store = MemoryStore::default();
        let logger = LoggerNode::new(store.clone(), 100, Duration::from_millis(1));
        logger.start().unwrap();

        logger.process_message(&Message::of_type(MessageType::PowerTrack));
        logger.process_message(&Message::of_type(MessageType::AisData));
        logger.stop();

        assert_eq!(store.batch_sizes(), vec![2]);
        assert_eq!(logger.pending(), 0);
    }

    #[test]
    fn test_config_messages_are_not_logged() {
        let store = MemoryStore::default();
        let config = Arc::new(StaticConfig::new());
        config.set_log_queue_size(5);
        config.set_loop_time(NodeId::DbLogger, Duration::from_millis(30));
        let logger = LoggerNode::new(store, 100, Duration::from_secs(1)).with_config(config);

        logger.process_message(&Message::of_type(MessageType::ServerConfigsReceived));

        assert_eq!(logger.pending(), 0);
        assert_eq!(logger.queue_size(), 5);
        assert_eq!(logger.period.get(), Duration::from_millis(30));
    }

    #[test]
    fn test_queue_size_change_applies_to_a_running_logger() {
        let store = MemoryStore::default();
        let config = Arc::new(StaticConfig::new());
        let logger =
            LoggerNode::new(store.clone(), 100, Duration::from_millis(1)).with_config(config.clone());
        logger.start().unwrap();

        config.set_log_queue_size(2);
        logger.process_message(&Message::of_type(MessageType::ServerConfigsReceived));
        assert_eq!(logger.queue_size(), 2);

        logger.process_message(&rudder(1.0));
        logger.process_message(&rudder(2.0));
        while logger.pending() != 0 {
            thread::sleep(Duration::from_millis(1));
        }
        logger.stop();

        assert_eq!(store.batch_sizes(), vec![2]);
    }

    #[test]
    fn test_zero_queue_size_is_raised_to_one() {
        let logger = LoggerNode::new(MemoryStore::default(), 0, Duration::from_secs(1));
        assert_eq!(logger.queue_size(), 1);
    }

    #[test]
    fn test_store_errors_drop_the_batch() {
        let logger = LoggerNode::new(FullDisk, 1, Duration::from_secs(1));
        logger.process_message(&rudder(4.0));
        logger.flush();

        assert_eq!(logger.pending(), 0);
    }
}
