//!
//! Utilities for Sailbus
//!
//! The main usage of this crate is for traits and items that don't
//! really fit in any of the other Sailbus crates, but are still useful
//! for writing nodes: packing message headers into byte buffers and
//! pacing worker loops.
//!

#![deny(missing_docs)]

pub mod packing;
pub use packing::{Packable, PackingError, ByteReader, ByteWriter};

pub mod timer;
pub use timer::Timer;
