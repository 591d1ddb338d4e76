//!
//! Worker-thread lifecycle, start-up helpers, and commonly used nodes for
//! Sailbus projects.
//!
//! Active nodes build on [`NodeThread`], which owns at most one worker at
//! a time and paces it with a [`LoopPeriod`].  The application brings
//! nodes up with [`initialise_node`] and keeps the active ones that
//! succeeded in an [`ActiveNodeSet`].
//!

#![deny(missing_docs)]

pub mod thread;
pub use thread::{LoopPeriod, NodeThread};

pub mod config;
pub use config::{ConfigSource, ConfigTable, StaticConfig};

pub mod startup;
pub use startup::{initialise_node, ActiveNodeSet, NodeImportance, StartupError};

pub mod sensor;
pub use sensor::{SensorReadNode, SensorSource};

pub mod logger;
pub use logger::{LogEntry, LogStore, LoggerNode};
