//! RDT - Reliable Data Transfer over UDP
//!
//! Session drivers that run the protocol core over a datagram socket: a
//! server that streams a byte source to one client, and a client that
//! downloads it into a sink.
//!
//! # Example
//!
//! ```no_run
//! use rdt::{Client, ClientConfig};
//! use rdt::io::RdtSocket;
//!
//! let socket = RdtSocket::bind("0.0.0.0:0".parse()?)?;
//! let client = Client::new(socket, ClientConfig::default());
//! let (data, report) = client.download("127.0.0.1:6555".parse()?, Vec::new())?;
//! println!("{} bytes, {:.0} bps", data.len(), report.throughput_bps());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod client;
pub mod error;
pub mod event;
pub mod report;
pub mod server;

pub use rdt_io as io;
pub use rdt_protocol as protocol;

pub use client::{Client, ClientConfig};
pub use error::SessionError;
pub use event::{wait_for_event, Event};
pub use report::{ReceiveReport, SendReport};
pub use server::{Server, ServerConfig};
