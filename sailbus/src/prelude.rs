//!
//! The types almost every Sailbus program needs.
//!

pub use sailbus_bus::{BusConfig, BusHandle, DispatchMode, MessageBus};
pub use sailbus_core::{
    ActiveNode, LifecycleError, Message, MessageType, Node, NodeError, NodeId, Payload,
};
pub use sailbus_nodes::{
    initialise_node, ActiveNodeSet, ConfigSource, LoopPeriod, NodeImportance, NodeThread,
    StartupError, StaticConfig,
};
pub use sailbus_utils::Timer;
