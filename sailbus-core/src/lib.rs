//!
//! Sailbus-Core is the collection of traits and data types shared by every
//! part of the sailbus framework: node identities, message kinds,
//! messages, and the passive and active node contracts.
//!

#![deny(unsafe_code)]
#![deny(missing_docs)]

pub mod ids;
pub use ids::{MessageType, NodeId};

pub mod message;
pub use message::{GpsFix, Message, Payload, DATA_OUT_OF_RANGE, NO_COMMAND};

pub mod node;
pub use node::{ActiveNode, Node};

pub mod error;
pub use error::{LifecycleError, NodeError};
