//! Session errors

use rdt_io::SocketError;
use rdt_protocol::{HandshakeError, TransferError};
use std::time::Duration;
use thiserror::Error;

/// Errors that end a client or server session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("Socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("Peer silent for {0:?}")]
    PeerIdle(Duration),
}
