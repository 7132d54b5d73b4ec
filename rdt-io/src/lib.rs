//! RDT I/O and Platform Abstraction
//!
//! This crate provides the datagram transport used by the session drivers:
//! a UDP socket wrapper, an in-memory link for tests, and timing utilities.

pub mod memory;
pub mod socket;
pub mod time;

pub use memory::{Delivery, MemorySocket};
pub use socket::{DatagramSocket, RdtSocket, SocketError};
pub use time::{time_until, Timer};
