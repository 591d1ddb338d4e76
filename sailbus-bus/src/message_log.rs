//!
//! Diagnostic log of every dispatched message and its consumers.
//!
//! One line is written per message as it is dispatched, followed by one
//! indented line per node that consumed it:
//!
//! ```text
//! [14:02:11:482] Type=WindData(1) SourceID=4 Destination=0 Received=14:02:11:431
//!     14:02:11:482 Consumed by Node: WindState(12)
//! ```
//!

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, Utc};

use crate::{queue::Envelope, registry::RegisteredNode};

/// Format a timestamp as `HH:MM:SS:mmm` (UTC)
pub fn timestamp(time: DateTime<Utc>) -> String {
    time.format("%H:%M:%S:%3f").to_string()
}

/// Writer for the diagnostic message log.
pub struct MessageLog {
    out: Box<dyn Write + Send>,
}

impl MessageLog {
    /// Create (or truncate) a log file at `path`
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    /// Log into any writer
    pub fn from_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    /// Record that a message is being dispatched
    pub(crate) fn message(&mut self, envelope: &Envelope) -> io::Result<()> {
        let message = &envelope.message;
        writeln!(
            self.out,
            "[{}] Type={}({}) SourceID={} Destination={} Received={}",
            timestamp(Utc::now()),
            message.message_type(),
            message.message_type().code(),
            message.source().code(),
            message.destination().code(),
            timestamp(envelope.received),
        )
    }

    /// Record that `node` consumed the message being dispatched
    pub(crate) fn consumer(&mut self, node: &RegisteredNode) -> io::Result<()> {
        writeln!(
            self.out,
            "\t{} Consumed by Node: {}({})",
            timestamp(Utc::now()),
            node.name(),
            node.id().code(),
        )
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
