//! Server side: wait for a request, then stream a byte source to the client

use crate::error::SessionError;
use crate::event::{wait_for_event, Event, RECV_BUFFER_SIZE};
use crate::report::SendReport;
use rdt_io::socket::DatagramSocket;
use rdt_io::time::Timer;
use rdt_protocol::handshake::is_request;
use rdt_protocol::{SenderConfig, SenderPipeline, Transmission};
use std::io::Read;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Sender pipeline settings
    pub sender: SenderConfig,
    /// Longest single wait while idle (accepting, or with nothing in flight)
    pub poll_interval: Duration,
    /// How often transfer progress is logged
    pub progress_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            sender: SenderConfig::default(),
            poll_interval: Duration::from_secs(1),
            progress_interval: Duration::from_secs(2),
        }
    }
}

/// Single-client file server
pub struct Server<S: DatagramSocket> {
    socket: S,
    config: ServerConfig,
}

impl<S: DatagramSocket> Server<S> {
    /// Create a server on a bound socket
    pub fn new(socket: S, config: ServerConfig) -> Self {
        Server { socket, config }
    }

    /// Local address the server listens on
    pub fn local_addr(&self) -> Result<SocketAddr, SessionError> {
        Ok(self.socket.local_addr()?)
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Wait for a connection request and return the client address
    pub fn accept(&self) -> Result<SocketAddr, SessionError> {
        loop {
            if let Some(peer) = self.accept_timeout(self.config.poll_interval)? {
                return Ok(peer);
            }
        }
    }

    /// Wait up to `timeout` for a connection request
    pub fn accept_timeout(&self, timeout: Duration) -> Result<Option<SocketAddr>, SessionError> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        loop {
            match wait_for_event(&self.socket, &mut buf, Some(deadline), timeout)? {
                Event::Datagram { payload, from } if is_request(&payload) => {
                    info!(peer = %from, "connection request received");
                    return Ok(Some(from));
                }
                Event::Datagram { payload, from } => {
                    debug!(peer = %from, len = payload.len(), "non-request datagram ignored");
                }
                Event::DeadlineElapsed => return Ok(None),
            }
        }
    }

    /// Stream `source` to `peer` until every byte is acknowledged
    pub fn serve<R: Read>(&self, peer: SocketAddr, source: R) -> Result<SendReport, SessionError> {
        let mut sender = SenderPipeline::new(source, self.config.sender.clone())?;
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        let start = Instant::now();
        let mut progress = Timer::new(self.config.progress_interval, start);
        info!(peer = %peer, window = ?self.config.sender.window, "transfer started");

        let initial = sender.poll_transmit(start)?;
        self.send_all(peer, &initial)?;

        while !sender.is_closed() {
            let event = wait_for_event(
                &self.socket,
                &mut buf,
                sender.next_deadline(),
                self.config.poll_interval,
            )?;
            let now = Instant::now();

            let out = match event {
                Event::Datagram { payload, from } if from != peer => {
                    debug!(from = %from, len = payload.len(), "datagram from unknown peer ignored");
                    Vec::new()
                }
                Event::Datagram { payload, .. } if is_request(&payload) => {
                    debug!("repeated connection request ignored");
                    Vec::new()
                }
                Event::Datagram { payload, .. } => sender.on_datagram(&payload, now)?,
                Event::DeadlineElapsed => sender.on_timeout(now)?,
            };
            self.send_all(peer, &out)?;

            let out = sender.poll_transmit(now)?;
            self.send_all(peer, &out)?;

            if progress.try_fire(now) {
                let cc = sender.congestion_stats();
                info!(
                    acked = sender.base(),
                    in_flight = sender.flight_size(),
                    cwnd = cc.cwnd,
                    ssthresh = cc.ssthresh,
                    phase = ?cc.phase,
                    rto_ms = sender.rto().as_millis() as u64,
                    "transfer progress"
                );
            }
        }

        let report = SendReport {
            bytes: sender.base() as u64,
            duration: start.elapsed(),
            stats: sender.stats().clone(),
            congestion: sender.congestion_stats(),
            srtt: sender.rtt().srtt(),
            rto: sender.rto(),
        };
        info!(
            peer = %peer,
            bytes = report.bytes,
            retransmissions = report.stats.retransmissions,
            elapsed_ms = report.duration.as_millis() as u64,
            "transfer complete"
        );
        Ok(report)
    }

    fn send_all(&self, peer: SocketAddr, out: &[Transmission]) -> Result<(), SessionError> {
        for t in out {
            self.socket.send_to(&t.segment.to_bytes(), peer)?;
        }
        Ok(())
    }
}
