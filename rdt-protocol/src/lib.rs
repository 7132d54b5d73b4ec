//! RDT Protocol Core Implementation
//!
//! This crate implements the core of a reliable byte-stream transfer over
//! UDP: the segment codec, the send window and reassembly buffer, RTT
//! estimation, Reno congestion control, and the sender and receiver
//! pipelines. It performs no network I/O; drivers feed it datagrams and the
//! current time and send whatever it returns.

pub mod ack;
pub mod buffer;
pub mod congestion;
pub mod connection;
pub mod handshake;
pub mod packet;
pub mod receiver;
pub mod rtt;
pub mod sender;

pub use ack::{AckSegment, SackBlock, MAX_SACK_BLOCKS};
pub use buffer::{InFlight, InsertOutcome, ReceiveBuffer, SendWindow};
pub use congestion::{CongestionController, CongestionEvent, CongestionPhase, CongestionStats};
pub use connection::{ReceiverConfig, SenderConfig, TransferError, WindowPolicy};
pub use handshake::{HandshakeError, RetryPolicy};
pub use packet::{DataSegment, Packet, PacketError, PacketType, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use receiver::{ReceiverAction, ReceiverPipeline, ReceiverStats};
pub use rtt::RttEstimator;
pub use sender::{SenderPipeline, SenderState, SenderStats, TransmitKind, Transmission};
