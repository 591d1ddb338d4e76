//!
//! Participants on the bus.
//!
//! A [`Node`] is a passive participant: the bus calls
//! [`Node::process_message`] on the dispatcher thread whenever a message
//! the node is interested in (or addressed to) comes through.  Nodes are
//! shared between the application and the bus (`Arc<dyn Node>`), so every
//! method takes `&self` and nodes keep mutable state behind their own
//! locks.
//!
//! An [`ActiveNode`] additionally owns a worker thread that it starts and
//! stops.  The worker typically reads hardware or runs a control loop at a
//! fixed rate and sends the results back through the bus.
//!

use crate::{
    error::{LifecycleError, NodeError},
    ids::NodeId,
    message::Message,
};

/// A passive participant on the bus.
pub trait Node: Send + Sync {
    /// The identity of this node.
    ///
    /// Directed messages are delivered to the registered node whose id
    /// equals their destination, so ids should be unique on a bus.  The
    /// bus reads the id once, when the node is registered.
    fn id(&self) -> NodeId;

    /// A human readable name, used in logs.  Like the id, the bus reads it
    /// once at registration.
    fn name(&self) -> &str {
        self.id().name()
    }

    /// Acquire or set up the resources the node needs to function.
    ///
    /// A failure here is not fatal by itself; the caller decides whether
    /// the system can run without this node.
    fn init(&self) -> Result<(), NodeError>;

    /// Called by the bus with a message the node subscribed to or that was
    /// addressed to it.
    ///
    /// Note: this runs on the dispatcher thread so it must not block for
    /// long, and the message cannot be retained past the call (clone what
    /// you need).
    fn process_message(&self, message: &Message);

    /// Re-read the node's configurable values from the configuration store.
    ///
    /// Usually called on receipt of a `ServerConfigsReceived` message.
    fn update_configs(&self) {}

    /// Whether this node owns a worker thread
    fn is_active_node(&self) -> bool {
        false
    }
}

/// A node that owns a worker thread.
///
/// The lifecycle is `Idle -> start() -> Running -> stop() -> Idle`, and a
/// node can go around that cycle any number of times.
pub trait ActiveNode: Node {
    /// Spawn the worker thread.
    ///
    /// Calling this while the worker is already running is a programming
    /// error: implementations must return [`LifecycleError::AlreadyRunning`]
    /// and leave the running thread alone.
    fn start(&self) -> Result<(), LifecycleError>;

    /// Ask the worker thread to stop and wait for it to exit.
    ///
    /// Stopping is cooperative: the iteration in progress finishes first.
    /// Stopping an idle node does nothing.
    fn stop(&self);
}
