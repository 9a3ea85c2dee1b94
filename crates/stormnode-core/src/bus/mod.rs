//! Host-facing bus protocol
//!
//! The node is a single fixed-address responder. Every read request from the
//! host is answered with one [`Snapshot`] frame of eight big-endian words.

mod responder;
mod snapshot;

pub use responder::*;
pub use snapshot::*;
