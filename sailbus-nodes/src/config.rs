//!
//! Where nodes read their tunable values from.
//!
//! Nodes hold an `Arc<dyn ConfigSource>` and consult it from
//! `update_configs`, which the bus triggers by delivering a
//! `ServerConfigsReceived` message.
//!

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use serde::Deserialize;

use sailbus_core::{NodeError, NodeId};

/// A store of node configuration values.
pub trait ConfigSource: Send + Sync {
    /// The loop period configured for `node`, if any
    fn loop_time(&self, node: NodeId) -> Option<Duration>;

    /// How many entries a logging node should buffer before flushing
    fn log_queue_size(&self) -> Option<usize> {
        None
    }
}

/// The serialised form of a [`StaticConfig`].
///
/// ```toml
/// log_queue_size = 20
///
/// [loop_times]
/// CanWindSensor = 0.1
/// Compass = 0.25
/// ```
///
/// Loop times are in seconds and keyed by node name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigTable {
    /// Loop period per node name, in seconds
    #[serde(default)]
    pub loop_times: HashMap<String, f64>,
    /// Batch size for logging nodes
    #[serde(default)]
    pub log_queue_size: Option<usize>,
}

#[derive(Debug, Default)]
struct Values {
    loop_times: HashMap<NodeId, Duration>,
    log_queue_size: Option<usize>,
}

/// An in-memory configuration store.
///
/// Values can be changed while nodes are running; they pick the change up
/// the next time they refresh their configuration.
#[derive(Debug, Default)]
pub struct StaticConfig {
    values: RwLock<Values>,
}

impl StaticConfig {
    /// Create an empty configuration store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from its serialised form.
    ///
    /// Fails on unknown node names and on loop times that are negative or
    /// not finite.
    pub fn from_table(table: ConfigTable) -> Result<Self, NodeError> {
        let mut loop_times = HashMap::with_capacity(table.loop_times.len());
        for (name, seconds) in table.loop_times {
            let node = NodeId::from_name(&name).ok_or_else(|| NodeError::Config {
                node: NodeId::None,
                reason: format!("unknown node name {name:?}"),
            })?;
            let period = Duration::try_from_secs_f64(seconds).map_err(|_| NodeError::Config {
                node,
                reason: format!("loop time {seconds} is not a valid duration"),
            })?;
            loop_times.insert(node, period);
        }

        Ok(Self {
            values: RwLock::new(Values {
                loop_times,
                log_queue_size: table.log_queue_size,
            }),
        })
    }

    /// Set the loop period of `node`
    pub fn set_loop_time(&self, node: NodeId, period: Duration) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .loop_times
            .insert(node, period);
    }

    /// Set the batch size for logging nodes
    pub fn set_log_queue_size(&self, size: usize) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .log_queue_size = Some(size);
    }
}

impl ConfigSource for StaticConfig {
    fn loop_time(&self, node: NodeId) -> Option<Duration> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .loop_times
            .get(&node)
            .copied()
    }

    fn log_queue_size(&self) -> Option<usize> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .log_queue_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_table() {
        let mut table = ConfigTable::default();
        table.loop_times.insert("Compass".into(), 0.25);
        table.log_queue_size = Some(8);

        let config = StaticConfig::from_table(table).unwrap();

        assert_eq!(
            config.loop_time(NodeId::Compass),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.loop_time(NodeId::Gpsd), None);
        assert_eq!(config.log_queue_size(), Some(8));
    }

    #[test]
    fn test_from_table_rejects_unknown_nodes() {
        let mut table = ConfigTable::default();
        table.loop_times.insert("Rudder".into(), 0.1);

        let result = StaticConfig::from_table(table);
        assert!(matches!(result, Err(NodeError::Config { node: NodeId::None, .. })));
    }

    #[test]
    fn test_from_table_rejects_negative_loop_times() {
        let mut table = ConfigTable::default();
        table.loop_times.insert("Gpsd".into(), -1.0);

        let result = StaticConfig::from_table(table);
        assert!(matches!(result, Err(NodeError::Config { node: NodeId::Gpsd, .. })));
    }

    #[test]
    fn test_set_loop_time_overrides() {
        let config = StaticConfig::new();
        config.set_loop_time(NodeId::CanWindSensor, Duration::from_millis(100));
        config.set_loop_time(NodeId::CanWindSensor, Duration::from_millis(40));

        assert_eq!(
            config.loop_time(NodeId::CanWindSensor),
            Some(Duration::from_millis(40))
        );
    }
}
