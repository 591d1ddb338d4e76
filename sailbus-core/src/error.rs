//!
//! Errors reported by nodes.
//!

use std::io;

use thiserror::Error;

use crate::ids::NodeId;

/// An error from a node acquiring or using its resources.
///
/// These are local to the node: they are returned from [`crate::Node::init`]
/// and logged by whoever drives the node, never escalated by the bus.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node could not set up what it needs to run
    #[error("{node} failed to initialise: {reason}")]
    Init {
        /// The node that failed
        node: NodeId,
        /// Why it failed
        reason: String,
    },
    /// A configuration value was missing or malformed
    #[error("invalid configuration for {node}: {reason}")]
    Config {
        /// The node being configured
        node: NodeId,
        /// What was wrong
        reason: String,
    },
    /// An I/O error from the node's hardware or storage link
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Misuse of an active node's worker-thread lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `start` was called while the node's worker thread was still running
    #[error("{0} is already running; stop it before starting it again")]
    AlreadyRunning(NodeId),
    /// The operating system refused to spawn the worker thread
    #[error("could not spawn the worker thread for {node}: {source}")]
    Spawn {
        /// The node whose thread failed to spawn
        node: NodeId,
        /// The underlying error
        #[source]
        source: io::Error,
    },
}
