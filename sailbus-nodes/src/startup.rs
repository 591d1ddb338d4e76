//!
//! Bringing nodes up and taking them down in order.
//!
//! The application initialises each node with an importance.  A node that
//! fails to initialise is left out of the system unless it is critical, in
//! which case start-up is aborted.  Active nodes that came up are kept in
//! an [`ActiveNodeSet`] so they can be started together and stopped on
//! shutdown.
//!

use std::sync::Arc;

use thiserror::Error;

use sailbus_core::{ActiveNode, LifecycleError, Node, NodeError};

/// Whether the system can run without a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeImportance {
    /// Failure to initialise aborts start-up
    Critical,
    /// Failure to initialise is logged and the node is left out
    NotCritical,
}

/// A failure that aborts system start-up.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A critical node failed to initialise
    #[error("critical node {name} failed to initialise")]
    CriticalInit {
        /// The node's name
        name: String,
        /// Why it failed
        #[source]
        source: NodeError,
    },
    /// An active node's worker could not be started
    #[error("could not start {name}")]
    Start {
        /// The node's name
        name: String,
        /// Why it failed
        #[source]
        source: LifecycleError,
    },
}

/// Initialise `node`, logging the outcome.
///
/// Returns whether the node is usable.  Only a failing critical node is an
/// error.
pub fn initialise_node<N: Node + ?Sized>(
    node: &N,
    importance: NodeImportance,
) -> Result<bool, StartupError> {
    match node.init() {
        Ok(()) => {
            log::info!("Node: {} - init\t[OK]", node.name());
            Ok(true)
        }
        Err(source) => {
            log::warn!("Node: {} - init\t[FAILED]: {}", node.name(), source);
            match importance {
                NodeImportance::Critical => {
                    log::error!("Critical node {} failed to initialise", node.name());
                    Err(StartupError::CriticalInit {
                        name: node.name().to_string(),
                        source,
                    })
                }
                NodeImportance::NotCritical => Ok(false),
            }
        }
    }
}

/// The active nodes that made it through initialisation
#[derive(Default)]
pub struct ActiveNodeSet {
    nodes: Vec<Arc<dyn ActiveNode>>,
}

impl ActiveNodeSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise `node` and keep it if it came up.
    ///
    /// Returns whether the node was kept.
    pub fn initialise(
        &mut self,
        node: Arc<dyn ActiveNode>,
        importance: NodeImportance,
    ) -> Result<bool, StartupError> {
        let usable = initialise_node(&*node, importance)?;
        if usable {
            self.nodes.push(node);
        }
        Ok(usable)
    }

    /// Start every node in the order they were added.
    ///
    /// If one fails to start, the nodes already started are stopped again.
    pub fn start_all(&self) -> Result<(), StartupError> {
        for (started, node) in self.nodes.iter().enumerate() {
            if let Err(source) = node.start() {
                for running in self.nodes[..started].iter().rev() {
                    running.stop();
                }
                return Err(StartupError::Start {
                    name: node.name().to_string(),
                    source,
                });
            }
            log::info!("Node: {} - started", node.name());
        }
        Ok(())
    }

    /// Stop every node, most recently added first
    pub fn stop_all(&self) {
        for node in self.nodes.iter().rev() {
            node.stop();
            log::info!("Node: {} - stopped", node.name());
        }
    }

    /// The number of nodes in the set
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The nodes in the set
    pub fn nodes(&self) -> &[Arc<dyn ActiveNode>] {
        &self.nodes
    }
}
