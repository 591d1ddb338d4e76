//!
//! # Sailbus
//!
//! Sailbus is the messaging backbone for the control software of an
//! autonomous sailing vessel.
//!
//! ## Description
//!
//! Every piece of the vessel's software (sensor readers, estimators,
//! controllers, loggers) is a Node.  Nodes never talk to each other
//! directly.  Instead they send Messages onto a single Message Bus, which
//! delivers each one on a dedicated dispatcher thread to the nodes that
//! care about it.
//!
//! ## Technical Overview
//!
//! A Message carries a type, the id of the node that sent it, and a
//! destination.  A message with no destination (`NodeId::None`) is a
//! broadcast and reaches every node that subscribed to its type; a message
//! with a destination reaches only that node, subscribed or not.
//!
//! Passive nodes only react to messages.  Active nodes also own a worker
//! thread which they start and stop, and which typically reads a sensor or
//! runs a control loop at a configurable rate, feeding its results back
//! through the bus.
//!
//! A vessel's `main` therefore looks like:
//!
//! 1. Create the `MessageBus` and hand a `BusHandle` to every node.
//! 2. Initialise each node, giving up if a critical one fails.
//! 3. Register the nodes that came up for the message types they consume.
//! 4. Start the active nodes, then run the bus on its own thread.
//! 5. On shutdown, stop the active nodes and then the bus.
//!
//! The `minimal-vessel` demo in this repository wires exactly that.
//!

pub mod prelude;

/// Sailbus Core Traits and Message Types
pub use sailbus_core as core;
/// Sailbus Message Bus
pub use sailbus_bus as bus;
/// Sailbus Node Lifecycle and Common Nodes
pub use sailbus_nodes as nodes;
/// Sailbus Utility Functionality and Traits
pub use sailbus_utils as utils;
