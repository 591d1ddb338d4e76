//!
//! The Message Bus
//!
//! The message bus decouples producers from consumers.  Any thread can
//! send a message through a [`BusHandle`]; a single dispatcher thread
//! running [`MessageBus::run`] swaps the queued messages out in batches
//! and hands each message to the nodes that should see it:
//!
//! * broadcasts (destination [`sailbus_core::NodeId::None`]) go to every registered node
//!   subscribed to the message's type, in registration order;
//! * directed messages go to the registered node whose id is the
//!   destination, whatever that node subscribed to.
//!
//! Nodes are registered while the bus is being assembled.  Once `run` has
//! been called the registry is frozen and further registrations are
//! rejected.
//!

use std::{
    any::Any,
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use log::{error, info, warn};

use sailbus_core::{Message, MessageType, Node};

use crate::{
    config::BusConfig,
    error::BusError,
    queue::{Envelope, FrontQueue},
    registry::{RegisteredNode, Registry},
};

#[cfg(feature = "message-log")]
use crate::message_log::MessageLog;

/// Cloneable handle used by nodes and other threads to send messages
/// into a bus and to stop it.
#[derive(Clone, Debug)]
pub struct BusHandle {
    front: Arc<FrontQueue>,
}

impl BusHandle {
    /// Enqueue a message for dispatch.
    ///
    /// This only holds the front-queue lock for the push, so it is safe to
    /// call from any thread, including from inside a node's
    /// `process_message` on the dispatcher thread.
    pub fn send_message(&self, message: Message) {
        self.front.push(message);
    }

    /// Ask the dispatch loop to return.
    ///
    /// Messages sent before the stop are still delivered.  Calling this
    /// more than once is harmless.
    pub fn stop(&self) {
        self.front.request_stop();
    }

    /// Whether a stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.front.is_stop_requested()
    }

    /// Number of messages waiting for the next dispatch batch
    pub fn pending(&self) -> usize {
        self.front.len()
    }
}

/// The message bus: registry of nodes, double-buffered queue, and the
/// dispatch loop.
pub struct MessageBus {
    /// Queue producers push onto, shared with every handle
    front: Arc<FrontQueue>,
    /// Queue the dispatcher drains; only touched by `run`
    back: VecDeque<Envelope>,
    /// The registered nodes
    registry: Registry,
    /// The bus configuration
    config: BusConfig,
    /// Whether `run` has been called (registration is closed)
    started: bool,
    /// The diagnostic message log
    log: DispatchLog,
}

impl MessageBus {
    /// Create a message bus with the default configuration
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a message bus with a given configuration
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            front: Arc::new(FrontQueue::default()),
            back: VecDeque::new(),
            registry: Registry::default(),
            config,
            started: false,
            log: DispatchLog::default(),
        }
    }

    /// Log dispatched messages into `message_log` instead of the file named
    /// by the configuration
    #[cfg(feature = "message-log")]
    pub fn with_message_log(mut self, message_log: MessageLog) -> Self {
        self.log.log = Some(message_log);
        self
    }

    /// A handle for sending messages into this bus
    pub fn handle(&self) -> BusHandle {
        BusHandle {
            front: self.front.clone(),
        }
    }

    /// The bus configuration
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Whether the dispatch loop has been started
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The registered nodes, in registration order
    pub fn registered_nodes(&self) -> &[RegisteredNode] {
        self.registry.as_slice()
    }

    /// Register a node so it receives messages addressed to it.
    ///
    /// Registering a node that is already registered does nothing.
    pub fn register_node(&mut self, node: Arc<dyn Node>) -> Result<(), BusError> {
        self.check_open(&*node)?;
        self.registry.register(node);
        Ok(())
    }

    /// Register a node and subscribe it to broadcasts of `message_type`.
    ///
    /// Subscriptions accumulate: registering the same node for several
    /// types keeps a single record interested in all of them.
    pub fn register_node_for(
        &mut self,
        node: Arc<dyn Node>,
        message_type: MessageType,
    ) -> Result<(), BusError> {
        self.check_open(&*node)?;
        self.registry.subscribe(node, message_type);
        Ok(())
    }

    fn check_open(&self, node: &dyn Node) -> Result<(), BusError> {
        if self.started {
            warn!("Rejected registration of {}: the message bus is running", node.name());
            return Err(BusError::RegistrationClosed { node: node.id() });
        }
        Ok(())
    }

    /// Enqueue a message for dispatch
    pub fn send_message(&self, message: Message) {
        self.front.push(message);
    }

    /// Ask the dispatch loop to return
    pub fn stop(&self) {
        self.front.request_stop();
    }

    /// Run the dispatch loop on the current thread until [`BusHandle::stop`]
    /// (or [`MessageBus::stop`]) is called.
    ///
    /// Each iteration waits for messages, swaps the front and back queues,
    /// and delivers the batch in FIFO order.  When a stop is observed the
    /// messages already enqueued are delivered before returning.
    pub fn run(&mut self) {
        if !self.started {
            self.started = true;
            self.log.open(&self.config);
            info!(
                "Message bus running with {} registered nodes",
                self.registry.len()
            );
        }

        while !self.front.is_stop_requested() {
            self.front.wait_and_swap(
                &mut self.back,
                self.config.dispatch_mode,
                self.config.poll_interval,
            );
            self.process_messages();
        }

        self.front.swap_now(&mut self.back);
        self.process_messages();
        info!("Message bus stopped");
    }

    /// Deliver every message in the back queue, dropping each one once its
    /// deliveries are done
    fn process_messages(&mut self) {
        while let Some(envelope) = self.back.pop_front() {
            self.dispatch(&envelope);
        }
    }

    fn dispatch(&mut self, envelope: &Envelope) {
        let message = &envelope.message;
        self.log.message(envelope);

        if message.is_broadcast() {
            for registered in self.registry.interested(message.message_type()) {
                if deliver(registered, message) {
                    self.log.consumer(registered);
                }
            }
        } else if let Some(registered) = self.registry.find(message.destination()) {
            if deliver(registered, message) {
                self.log.consumer(registered);
            }
        }

        self.log.flush();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Records dispatch events into the message log when one is open
#[derive(Default)]
struct DispatchLog {
    #[cfg(feature = "message-log")]
    log: Option<MessageLog>,
}

#[cfg_attr(not(feature = "message-log"), allow(unused_variables))]
impl DispatchLog {
    /// Open the log file named by the configuration unless a log has
    /// already been provided
    #[cfg(feature = "message-log")]
    fn open(&mut self, config: &BusConfig) {
        if self.log.is_some() {
            return;
        }

        if let Some(path) = config.message_log.as_ref() {
            match MessageLog::create(path) {
                Ok(message_log) => {
                    info!("Message log file created at {}", path.display());
                    self.log = Some(message_log);
                }
                Err(err) => error!("Message log file {} not created: {}", path.display(), err),
            }
        }
    }

    #[cfg(not(feature = "message-log"))]
    fn open(&mut self, _config: &BusConfig) {}

    fn message(&mut self, envelope: &Envelope) {
        #[cfg(feature = "message-log")]
        self.record(|log| log.message(envelope));
    }

    fn consumer(&mut self, node: &RegisteredNode) {
        #[cfg(feature = "message-log")]
        self.record(|log| log.consumer(node));
    }

    fn flush(&mut self) {
        #[cfg(feature = "message-log")]
        self.record(MessageLog::flush);
    }

    #[cfg(feature = "message-log")]
    fn record(&mut self, write: impl FnOnce(&mut MessageLog) -> std::io::Result<()>) {
        if let Some(log) = self.log.as_mut() {
            if let Err(err) = write(log) {
                warn!("Disabling the message log: {}", err);
                self.log = None;
            }
        }
    }
}

/// Hand `message` to `node`, containing any panic so the rest of the
/// fan-out still happens.  Returns whether the node consumed the message.
fn deliver(registered: &RegisteredNode, message: &Message) -> bool {
    let node = registered.node();
    match panic::catch_unwind(AssertUnwindSafe(|| node.process_message(message))) {
        Ok(()) => true,
        Err(cause) => {
            error!(
                "{}({}) panicked while processing {} from {}: {}",
                registered.name(),
                registered.id().code(),
                message.message_type(),
                message.source(),
                panic_message(&*cause)
            );
            false
        }
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(message) = cause.downcast_ref::<&str>() {
        message
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message
    } else {
        "unknown cause"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Mutex,
        },
        thread,
        time::{Duration, Instant},
    };

    use sailbus_core::{NodeError, NodeId};

    use crate::config::DispatchMode;
    #[cfg(feature = "message-log")]
    use crate::message_log::tests::SharedBuffer;

    /// Records every message it receives
    struct RecordingNode {
        id: NodeId,
        received: Mutex<Vec<Message>>,
    }

    impl RecordingNode {
        fn new(id: NodeId) -> Arc<Self> {
            Arc::new(Self {
                id,
                received: Mutex::new(Vec::new()),
            })
        }

        fn received(&self) -> Vec<Message> {
            self.received.lock().unwrap().clone()
        }
    }

    impl Node for RecordingNode {
        fn id(&self) -> NodeId {
            self.id
        }

        fn init(&self) -> Result<(), NodeError> {
            Ok(())
        }

        fn process_message(&self, message: &Message) {
            self.received.lock().unwrap().push(message.clone());
        }
    }

    /// Panics on every message
    struct FaultyNode;

    impl Node for FaultyNode {
        fn id(&self) -> NodeId {
            NodeId::CameraProcessing
        }

        fn init(&self) -> Result<(), NodeError> {
            Ok(())
        }

        fn process_message(&self, message: &Message) {
            panic!("cannot handle {}", message.message_type());
        }
    }

    /// Run `bus` on a dispatcher thread, send `messages`, stop, and hand the
    /// bus back
    fn run_with(mut bus: MessageBus, messages: Vec<Message>) -> MessageBus {
        let handle = bus.handle();
        let dispatcher = thread::spawn(move || {
            bus.run();
            bus
        });
        for message in messages {
            handle.send_message(message);
        }
        handle.stop();
        dispatcher.join().unwrap()
    }

    #[test]
    fn test_broadcast_reaches_subscribers_in_order() {
        let mut bus = MessageBus::new();
        let first = RecordingNode::new(NodeId::WindState);
        let second = RecordingNode::new(NodeId::DbLogger);
        let bystander = RecordingNode::new(NodeId::HttpSync);
        bus.register_node_for(first.clone(), MessageType::WindData).unwrap();
        bus.register_node_for(second.clone(), MessageType::WindData).unwrap();
        bus.register_node_for(bystander.clone(), MessageType::GpsData).unwrap();

        run_with(
            bus,
            vec![
                Message::with_source(MessageType::WindData, NodeId::CanWindSensor),
                Message::with_source(MessageType::CompassData, NodeId::Compass),
                Message::with_source(MessageType::WindData, NodeId::CanWindSensor),
            ],
        );

        assert_eq!(first.received().len(), 2);
        assert_eq!(second.received().len(), 2);
        assert!(bystander.received().is_empty());
    }

    #[test]
    fn test_directed_message_ignores_subscriptions() {
        let mut bus = MessageBus::new();
        let target = RecordingNode::new(NodeId::ActuatorAspire);
        let other = RecordingNode::new(NodeId::CourseRegulator);
        bus.register_node(target.clone()).unwrap();
        bus.register_node_for(other.clone(), MessageType::RudderCommand).unwrap();

        run_with(
            bus,
            vec![Message::new(
                MessageType::RudderCommand,
                NodeId::CourseRegulator,
                NodeId::ActuatorAspire,
            )],
        );

        assert_eq!(target.received().len(), 1);
        assert!(other.received().is_empty());
    }

    #[test]
    fn test_directed_message_to_unregistered_node_is_dropped() {
        let mut bus = MessageBus::new();
        let node = RecordingNode::new(NodeId::WindState);
        bus.register_node_for(node.clone(), MessageType::WindData).unwrap();

        run_with(
            bus,
            vec![Message::new(MessageType::WindData, NodeId::None, NodeId::Simulator)],
        );

        assert!(node.received().is_empty());
    }

    #[test]
    fn test_registration_rejected_after_run() {
        let mut bus = MessageBus::new();
        let early = RecordingNode::new(NodeId::WindState);
        bus.register_node_for(early.clone(), MessageType::WindData).unwrap();

        let mut bus = run_with(bus, vec![]);
        assert!(bus.is_started());

        let late = RecordingNode::new(NodeId::LineFollow);
        assert_eq!(
            bus.register_node_for(late.clone(), MessageType::WindData),
            Err(BusError::RegistrationClosed { node: NodeId::LineFollow })
        );
        assert_eq!(
            bus.register_node(late.clone()),
            Err(BusError::RegistrationClosed { node: NodeId::LineFollow })
        );
        assert_eq!(bus.registered_nodes().len(), 1);

        // Later dispatches still only reach the early node
        bus.send_message(Message::of_type(MessageType::WindData));
        bus.send_message(Message::new(MessageType::WindData, NodeId::None, NodeId::LineFollow));
        bus.run();

        assert_eq!(early.received().len(), 1);
        assert!(late.received().is_empty());
    }

    #[test]
    fn test_panicking_node_does_not_stop_fan_out() {
        let mut bus = MessageBus::new();
        let before = RecordingNode::new(NodeId::StateEstimation);
        let after = RecordingNode::new(NodeId::DbLogger);
        bus.register_node_for(before.clone(), MessageType::GpsData).unwrap();
        bus.register_node_for(Arc::new(FaultyNode), MessageType::GpsData).unwrap();
        bus.register_node_for(after.clone(), MessageType::GpsData).unwrap();

        run_with(
            bus,
            vec![
                Message::of_type(MessageType::GpsData),
                Message::of_type(MessageType::GpsData),
            ],
        );

        assert_eq!(before.received().len(), 2);
        assert_eq!(after.received().len(), 2);
    }

    #[test]
    fn test_stop_before_run_delivers_pending_and_returns() {
        let mut bus = MessageBus::new();
        let node = RecordingNode::new(NodeId::PowerTrack);
        bus.register_node_for(node.clone(), MessageType::PowerTrack).unwrap();

        bus.send_message(Message::of_type(MessageType::PowerTrack));
        bus.stop();
        bus.stop();
        bus.run();

        assert_eq!(node.received().len(), 1);
    }

    #[test]
    fn test_stop_returns_within_poll_interval() {
        let mut bus = MessageBus::with_config(
            BusConfig::default()
                .with_poll_interval(Duration::from_millis(50))
                .with_dispatch_mode(DispatchMode::FixedInterval),
        );

        let handle = bus.handle();
        let dispatcher = thread::spawn(move || bus.run());
        thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        handle.stop();
        dispatcher.join().unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_stop_wakes_an_idle_dispatcher() {
        let mut bus = MessageBus::with_config(
            BusConfig::default().with_poll_interval(Duration::from_secs(30)),
        );
        assert_eq!(bus.config().dispatch_mode, DispatchMode::WakeOnEnqueue);

        let handle = bus.handle();
        let dispatcher = thread::spawn(move || bus.run());
        thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        handle.stop();
        dispatcher.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_duplicate_id_directed_message_reaches_first_node_only() {
        let mut bus = MessageBus::new();
        let first = RecordingNode::new(NodeId::Gpsd);
        let second = RecordingNode::new(NodeId::Gpsd);
        bus.register_node(first.clone()).unwrap();
        bus.register_node(second.clone()).unwrap();
        assert_eq!(bus.registered_nodes().len(), 2);

        run_with(
            bus,
            vec![Message::new(MessageType::DataRequest, NodeId::HttpSync, NodeId::Gpsd)],
        );

        assert_eq!(first.received().len(), 1);
        assert!(second.received().is_empty());
    }

    /// Answers `id` and `name` once each, then panics if asked again
    struct OneShotIdentityNode {
        id_asked: AtomicBool,
        name_asked: AtomicBool,
        received: AtomicUsize,
    }

    impl Node for OneShotIdentityNode {
        fn id(&self) -> NodeId {
            assert!(!self.id_asked.swap(true, Ordering::SeqCst), "id asked twice");
            NodeId::Simulator
        }

        fn name(&self) -> &str {
            assert!(!self.name_asked.swap(true, Ordering::SeqCst), "name asked twice");
            "Simulator"
        }

        fn init(&self) -> Result<(), NodeError> {
            Ok(())
        }

        fn process_message(&self, _message: &Message) {
            self.received.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_dispatch_uses_identity_captured_at_registration() {
        let mut bus = MessageBus::new();
        let node = Arc::new(OneShotIdentityNode {
            id_asked: AtomicBool::new(false),
            name_asked: AtomicBool::new(false),
            received: AtomicUsize::new(0),
        });
        let bystander = RecordingNode::new(NodeId::DbLogger);
        bus.register_node_for(node.clone(), MessageType::WindData).unwrap();
        bus.register_node_for(bystander.clone(), MessageType::WindData).unwrap();

        let bus = run_with(
            bus,
            vec![
                Message::of_type(MessageType::WindData),
                Message::new(MessageType::PowerOffCommand, NodeId::None, NodeId::Simulator),
            ],
        );

        assert_eq!(node.received.load(Ordering::SeqCst), 2);
        assert_eq!(bystander.received().len(), 1);
        assert_eq!(bus.registered_nodes()[0].id(), NodeId::Simulator);
        assert_eq!(bus.registered_nodes()[0].name(), "Simulator");
    }

    #[test]
    #[cfg(feature = "message-log")]
    fn test_message_log_lines() {
        let buffer = SharedBuffer::default();
        let mut bus = MessageBus::new().with_message_log(MessageLog::from_writer(buffer.clone()));
        let node = RecordingNode::new(NodeId::WindState);
        bus.register_node_for(node.clone(), MessageType::WindData).unwrap();

        run_with(
            bus,
            vec![
                Message::with_source(MessageType::WindData, NodeId::CanWindSensor),
                Message::with_source(MessageType::GpsData, NodeId::Gpsd),
            ],
        );

        let contents = buffer.contents();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].contains("] Type=WindData(1) SourceID=4 Destination=0 Received="));
        assert!(lines[1].starts_with('\t'));
        assert!(lines[1].ends_with("Consumed by Node: WindState(12)"));
        assert!(lines[2].contains("Type=GpsData(3) SourceID=9 Destination=0"));
    }
}
