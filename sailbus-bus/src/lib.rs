//!
//! Sailbus-Bus provides the message bus that connects every node on the
//! vessel.
//!
//! The bus owns a double-buffered message queue and a registry of nodes.
//! Producers on any thread push messages onto the front queue; one
//! dispatcher thread repeatedly swaps the front queue for its drained back
//! queue and fans each message out to the registered nodes that should see
//! it.  Delivery is sequential and in FIFO order within a batch, and a node
//! that panics while handling a message is logged and skipped rather than
//! taking the dispatcher down with it.
//!
//! ```no_run
//! use std::{sync::Arc, thread};
//!
//! use sailbus_bus::MessageBus;
//! # use sailbus_core::{Message, MessageType, Node, NodeError, NodeId};
//! # struct WindStateNode;
//! # impl Node for WindStateNode {
//! #     fn id(&self) -> NodeId { NodeId::WindState }
//! #     fn init(&self) -> Result<(), NodeError> { Ok(()) }
//! #     fn process_message(&self, _message: &Message) {}
//! # }
//!
//! let mut bus = MessageBus::new();
//! let handle = bus.handle();
//! bus.register_node_for(Arc::new(WindStateNode), MessageType::WindData).unwrap();
//!
//! let dispatcher = thread::spawn(move || bus.run());
//! handle.send_message(Message::with_source(MessageType::WindData, NodeId::CanWindSensor));
//! handle.stop();
//! dispatcher.join().unwrap();
//! ```
//!

#![deny(missing_docs)]

pub mod bus;
pub use bus::{BusHandle, MessageBus};

pub mod config;
pub use config::{BusConfig, DispatchMode};

pub mod error;
pub use error::BusError;

pub mod registry;
pub use registry::RegisteredNode;

mod queue;

#[cfg(feature = "message-log")]
pub mod message_log;
#[cfg(feature = "message-log")]
pub use message_log::MessageLog;
