//!
//! An Active Node that polls a sensor and publishes its readings.
//!
//! Each loop the worker takes the sensor's lock, reads one sample, and
//! sends it on the bus.  Reads that come back empty are skipped and read
//! errors are logged; neither stops the loop.
//!

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use sailbus_bus::BusHandle;
use sailbus_core::{
    ActiveNode, LifecycleError, Message, MessageType, Node, NodeError, NodeId, Payload,
};

use crate::{
    config::ConfigSource,
    thread::{LoopPeriod, NodeThread},
};

/// A device the [`SensorReadNode`] reads from.
pub trait SensorSource: Send + 'static {
    /// Open the device.  Called once from `init`.
    fn open(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Read one sample, or `None` if there is nothing new yet
    fn read(&mut self) -> Result<Option<Payload>, NodeError>;
}

struct Sampler<S> {
    id: NodeId,
    destination: NodeId,
    source: Mutex<S>,
    bus: BusHandle,
}

impl<S: SensorSource> Sampler<S> {
    fn source(&self) -> MutexGuard<'_, S> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poll(&self) {
        // Released before sending so a slow bus never holds up the device
        let reading = self.source().read();
        match reading {
            Ok(Some(payload)) => self
                .bus
                .send_message(Message::with_payload(payload, self.id, self.destination)),
            Ok(None) => {}
            Err(err) => log::warn!("{}: sensor read failed: {}", self.id, err),
        }
    }
}

/// Polls a [`SensorSource`] on its own worker thread.
///
/// Readings are broadcast unless a destination is set with
/// [`SensorReadNode::with_destination`].  Register the node for
/// `ServerConfigsReceived` to have it pick up loop time changes.
pub struct SensorReadNode<S: SensorSource> {
    sampler: Arc<Sampler<S>>,
    period: LoopPeriod,
    config: Option<Arc<dyn ConfigSource>>,
    thread: NodeThread,
}

impl<S: SensorSource> SensorReadNode<S> {
    /// Create a node reading `source` every `loop_time`
    pub fn new(id: NodeId, source: S, bus: BusHandle, loop_time: Duration) -> Self {
        Self {
            sampler: Arc::new(Sampler {
                id,
                destination: NodeId::None,
                source: Mutex::new(source),
                bus,
            }),
            period: LoopPeriod::new(loop_time),
            config: None,
            thread: NodeThread::new(id),
        }
    }

    /// Read the loop time from `config`
    pub fn with_config(mut self, config: Arc<dyn ConfigSource>) -> Self {
        self.config = Some(config);
        self
    }

    /// Address every reading to `destination` instead of broadcasting it.
    ///
    /// Must be called before the node is started.
    pub fn with_destination(mut self, destination: NodeId) -> Self {
        if let Some(sampler) = Arc::get_mut(&mut self.sampler) {
            sampler.destination = destination;
        } else {
            log::warn!(
                "{}: cannot change the destination of a started node",
                self.sampler.id
            );
        }
        self
    }

    /// The current loop time
    pub fn loop_time(&self) -> Duration {
        self.period.get()
    }

    /// Whether the worker is running
    pub fn is_running(&self) -> bool {
        self.thread.is_running()
    }
}

impl<S: SensorSource> Node for SensorReadNode<S> {
    fn id(&self) -> NodeId {
        self.sampler.id
    }

    fn init(&self) -> Result<(), NodeError> {
        self.sampler.source().open()?;
        self.update_configs();
        Ok(())
    }

    fn process_message(&self, message: &Message) {
        if message.message_type() == MessageType::ServerConfigsReceived {
            self.update_configs();
        }
    }

    fn update_configs(&self) {
        let Some(config) = &self.config else {
            return;
        };
        if let Some(loop_time) = config.loop_time(self.id()) {
            log::debug!("{}: loop time set to {:?}", self.id(), loop_time);
            self.period.set(loop_time);
        }
    }

    fn is_active_node(&self) -> bool {
        true
    }
}

impl<S: SensorSource> ActiveNode for SensorReadNode<S> {
    fn start(&self) -> Result<(), LifecycleError> {
        let sampler = self.sampler.clone();
        self.thread.start(self.period.clone(), move || sampler.poll())
    }

    fn stop(&self) {
        self.thread.stop();
    }
}
