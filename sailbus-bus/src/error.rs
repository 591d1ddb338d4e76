//!
//! Errors reported by the message bus.
//!

use thiserror::Error;

use sailbus_core::NodeId;

/// A misuse of the message bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BusError {
    /// A node was registered after the bus started dispatching.
    ///
    /// The registry is left untouched.
    #[error("cannot register {node}: the message bus has already started")]
    RegistrationClosed {
        /// The node that was turned away
        node: NodeId,
    },
}
