//!
//! The bus's record of registered nodes and what they subscribed to.
//!

use std::{ptr, sync::Arc};

use log::{info, warn};

use sailbus_core::{MessageType, Node, NodeId};

/// A node registered on the bus together with the message types it is
/// interested in.
///
/// The node's id and name are read once, at registration, so dispatch
/// never calls into the node outside of `process_message`.
pub struct RegisteredNode {
    node: Arc<dyn Node>,
    id: NodeId,
    name: String,
    subscriptions: Vec<MessageType>,
}

impl RegisteredNode {
    fn new(node: Arc<dyn Node>) -> Self {
        Self {
            id: node.id(),
            name: node.name().to_string(),
            node,
            subscriptions: Vec::new(),
        }
    }

    /// The registered node
    pub fn node(&self) -> &dyn Node {
        &*self.node
    }

    /// The node's id as it was when registered
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's name as it was when registered
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The message types this node receives as broadcasts, in the order
    /// they were subscribed
    pub fn subscriptions(&self) -> &[MessageType] {
        &self.subscriptions
    }

    /// Whether this node receives broadcasts of `message_type`
    pub fn is_interested(&self, message_type: MessageType) -> bool {
        self.subscriptions.contains(&message_type)
    }

    /// Whether this record belongs to `node` (the same object, not just
    /// the same id)
    fn is(&self, node: &Arc<dyn Node>) -> bool {
        ptr::addr_eq(Arc::as_ptr(&self.node), Arc::as_ptr(node))
    }

    /// Subscribe to `message_type`, keeping one copy of each type
    fn subscribe(&mut self, message_type: MessageType) {
        if !self.is_interested(message_type) {
            self.subscriptions.push(message_type);
        }
    }
}

/// Insertion-ordered list of registered nodes.
#[derive(Default)]
pub(crate) struct Registry {
    nodes: Vec<RegisteredNode>,
}

impl Registry {
    /// Find the record for `node`, creating it if this is the first time
    /// `node` has been registered
    fn entry(&mut self, node: Arc<dyn Node>) -> &mut RegisteredNode {
        if let Some(idx) = self.nodes.iter().position(|registered| registered.is(&node)) {
            return &mut self.nodes[idx];
        }

        let registered = RegisteredNode::new(node);
        if self.find(registered.id).is_some() {
            warn!(
                "{} registered twice with different node objects; directed messages will only reach the first",
                registered.id
            );
        }

        info!("New node registered: {}({})", registered.name, registered.id.code());
        let idx = self.nodes.len();
        self.nodes.push(registered);
        &mut self.nodes[idx]
    }

    /// Register `node` without subscribing it to anything
    pub fn register(&mut self, node: Arc<dyn Node>) {
        self.entry(node);
    }

    /// Register `node` and subscribe it to `message_type`
    pub fn subscribe(&mut self, node: Arc<dyn Node>, message_type: MessageType) {
        self.entry(node).subscribe(message_type);
    }

    /// The first registered node with the given id
    pub fn find(&self, id: NodeId) -> Option<&RegisteredNode> {
        self.nodes.iter().find(|registered| registered.id == id)
    }

    /// Registered nodes subscribed to `message_type`, in registration order
    pub fn interested(&self, message_type: MessageType) -> impl Iterator<Item = &RegisteredNode> {
        self.nodes
            .iter()
            .filter(move |registered| registered.is_interested(message_type))
    }

    pub fn as_slice(&self) -> &[RegisteredNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
