//!
//! A log store that prints to the console.
//!

use sailbus::core::NodeError;
use sailbus::nodes::{LogEntry, LogStore};

/// Writes every log entry through the `log` facade
pub struct ConsoleStore;

impl LogStore for ConsoleStore {
    fn store(&mut self, entries: &[LogEntry]) -> Result<(), NodeError> {
        for entry in entries {
            match &entry.payload {
                Some(payload) => log::info!(
                    "[{}] {} from {}: {:?}",
                    entry.logged_at.format("%H:%M:%S%.3f"),
                    entry.message_type,
                    entry.source,
                    payload
                ),
                None => log::info!(
                    "[{}] {} from {}",
                    entry.logged_at.format("%H:%M:%S%.3f"),
                    entry.message_type,
                    entry.source
                ),
            }
        }
        Ok(())
    }
}
