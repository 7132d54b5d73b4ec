//! Client side: request a stream from a server and write it to a sink

use crate::error::SessionError;
use crate::event::{wait_for_event, Event, RECV_BUFFER_SIZE};
use crate::report::ReceiveReport;
use bytes::Bytes;
use rdt_io::socket::DatagramSocket;
use rdt_io::time::Timer;
use rdt_protocol::handshake::{attempt, REQUEST};
use rdt_protocol::{ReceiverAction, ReceiverConfig, ReceiverPipeline, RetryPolicy};
use std::io::Write;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default time without a datagram from the server before giving up
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Client configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Receiver pipeline settings
    pub receiver: ReceiverConfig,
    /// Connection request retries
    pub retry: RetryPolicy,
    /// Give up after this long without hearing from the server
    pub idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            receiver: ReceiverConfig::default(),
            retry: RetryPolicy::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Single-transfer client
pub struct Client<S: DatagramSocket> {
    socket: S,
    config: ClientConfig,
}

impl<S: DatagramSocket> Client<S> {
    /// Create a client on a bound socket
    pub fn new(socket: S, config: ClientConfig) -> Self {
        Client { socket, config }
    }

    /// Local address of the client socket
    pub fn local_addr(&self) -> Result<SocketAddr, SessionError> {
        Ok(self.socket.local_addr()?)
    }

    /// Download the server's stream into `sink`
    ///
    /// Returns the sink once the EOF marker has been received and every
    /// byte before it written.
    pub fn download<W: Write>(
        &self,
        server: SocketAddr,
        sink: W,
    ) -> Result<(W, ReceiveReport), SessionError> {
        let start = Instant::now();
        let mut receiver = ReceiverPipeline::new(sink, self.config.receiver);
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        let (first, attempts) = self.connect(server, &mut buf)?;
        info!(server = %server, attempts, "connected");

        let mut closed = self.handle(server, &mut receiver, &first)?;
        let mut idle = Timer::new(self.config.idle_timeout, Instant::now());

        while !closed {
            match wait_for_event(
                &self.socket,
                &mut buf,
                Some(idle.deadline()),
                self.config.idle_timeout,
            )? {
                Event::Datagram { payload, from } if from == server => {
                    idle.reset(Instant::now());
                    closed = self.handle(server, &mut receiver, &payload)?;
                }
                Event::Datagram { from, .. } => {
                    debug!(from = %from, "datagram from unknown peer ignored");
                }
                Event::DeadlineElapsed => {
                    if idle.expired(Instant::now()) {
                        return Err(SessionError::PeerIdle(self.config.idle_timeout));
                    }
                }
            }
        }

        let stats = receiver.stats().clone();
        let report = ReceiveReport {
            bytes: stats.bytes_delivered,
            duration: start.elapsed(),
            attempts,
            stats,
        };
        info!(
            bytes = report.bytes,
            out_of_order = report.stats.out_of_order,
            duplicates = report.stats.duplicates,
            elapsed_ms = report.duration.as_millis() as u64,
            "download complete"
        );

        Ok((receiver.into_sink(), report))
    }

    /// Send the connection request until the server answers
    ///
    /// The first datagram from the server is the answer; it is returned so
    /// the caller can process it as data.
    fn connect(&self, server: SocketAddr, buf: &mut [u8]) -> Result<(Bytes, u32), SessionError> {
        attempt(self.config.retry, |n, timeout| {
            self.socket.send_to(&[REQUEST], server)?;

            let deadline = Instant::now() + timeout;
            loop {
                match wait_for_event(&self.socket, buf, Some(deadline), timeout)? {
                    Event::Datagram { payload, from } if from == server => {
                        return Ok(Some((payload, n)));
                    }
                    Event::Datagram { from, .. } => {
                        debug!(from = %from, "datagram from unknown peer ignored");
                    }
                    Event::DeadlineElapsed => return Ok(None),
                }
            }
        })
    }

    /// Feed one datagram to the receiver and send any reply
    ///
    /// Returns true once the stream is complete.
    fn handle<W: Write>(
        &self,
        server: SocketAddr,
        receiver: &mut ReceiverPipeline<W>,
        datagram: &[u8],
    ) -> Result<bool, SessionError> {
        match receiver.on_datagram(datagram)? {
            ReceiverAction::Ack(ack) => {
                self.socket.send_to(&ack.to_bytes(), server)?;
                Ok(false)
            }
            ReceiverAction::Close(ack) => {
                self.socket.send_to(&ack.to_bytes(), server)?;
                Ok(true)
            }
            ReceiverAction::Ignored => Ok(receiver.is_closed()),
        }
    }
}
