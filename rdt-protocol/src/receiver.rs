//! Receiving side of a transfer
//!
//! Reassembles data segments into the byte stream, writes contiguous bytes to
//! the sink in order and answers every data segment with an ACK describing
//! the next expected byte and the lowest range held out of order.

use crate::ack::AckSegment;
use crate::buffer::{InsertOutcome, ReceiveBuffer};
use crate::connection::{ReceiverConfig, TransferError};
use crate::packet::{DataSegment, Packet};
use std::io::Write;
use tracing::{debug, info};

/// What the driver must do after a datagram was processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverAction {
    /// Send this ACK to the sender
    Ack(AckSegment),
    /// Send this final ACK; the stream is complete and the sink is flushed
    Close(AckSegment),
    /// Nothing to send
    Ignored,
}

/// Receiver statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Data segments accepted for processing
    pub segments_received: u64,
    /// Bytes written to the sink
    pub bytes_delivered: u64,
    /// Segments that arrived ahead of the expected byte
    pub out_of_order: u64,
    /// Segments carrying only bytes already held or delivered
    pub duplicates: u64,
    /// Datagrams that failed to parse
    pub malformed: u64,
    /// Out-of-order segments dropped because the buffer was full
    pub buffer_full_drops: u64,
    /// ACKs handed to the driver
    pub acks_sent: u64,
}

/// Receiver pipeline writing the reassembled stream into `W`
pub struct ReceiverPipeline<W: Write> {
    sink: W,
    buffer: ReceiveBuffer,
    /// Stream offset of the EOF marker, once seen
    eof_offset: Option<u32>,
    closed: bool,
    stats: ReceiverStats,
}

impl<W: Write> ReceiverPipeline<W> {
    /// Create a receiver expecting the stream to start at offset 0
    pub fn new(sink: W, config: ReceiverConfig) -> Self {
        ReceiverPipeline {
            sink,
            buffer: ReceiveBuffer::new(0, config.max_buffered_segments),
            eof_offset: None,
            closed: false,
            stats: ReceiverStats::default(),
        }
    }

    /// Next byte offset expected in order
    pub fn expected_seq(&self) -> u32 {
        self.buffer.expected_seq()
    }

    /// Whether the stream has been completed and the sink flushed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Receiver statistics
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Consume the pipeline, returning the sink
    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Process one raw datagram
    ///
    /// Malformed datagrams and stray ACKs are dropped without reply.
    pub fn on_datagram(&mut self, datagram: &[u8]) -> Result<ReceiverAction, TransferError> {
        if self.closed {
            return Ok(ReceiverAction::Ignored);
        }

        match Packet::from_bytes(datagram) {
            Ok(Packet::Data(segment)) => self.on_segment(segment),
            Ok(Packet::Ack(ack)) => {
                debug!(ack = ack.ack_number, "stray ACK at receiver dropped");
                Ok(ReceiverAction::Ignored)
            }
            Err(e) => {
                self.stats.malformed += 1;
                debug!(error = %e, len = datagram.len(), "malformed datagram dropped");
                Ok(ReceiverAction::Ignored)
            }
        }
    }

    /// Process one decoded data segment
    pub fn on_segment(&mut self, segment: DataSegment) -> Result<ReceiverAction, TransferError> {
        if self.closed {
            return Ok(ReceiverAction::Ignored);
        }
        if segment.overflows() {
            self.stats.malformed += 1;
            debug!(
                seq = segment.seq,
                len = segment.len(),
                "segment past the sequence space dropped"
            );
            return Ok(ReceiverAction::Ignored);
        }
        self.stats.segments_received += 1;

        let expected = self.buffer.expected_seq();

        if segment.is_eof() {
            if segment.seq >= expected && self.eof_offset.is_none() {
                debug!(offset = segment.seq, "EOF marker received");
                self.eof_offset = Some(segment.seq);
            }
        } else if segment.seq > expected {
            match self.buffer.insert(segment.seq, segment.payload) {
                InsertOutcome::Buffered => self.stats.out_of_order += 1,
                InsertOutcome::Duplicate => self.stats.duplicates += 1,
                InsertOutcome::Full => {
                    self.stats.buffer_full_drops += 1;
                    debug!(seq = segment.seq, "receive buffer full, segment dropped");
                }
                InsertOutcome::Overflow => self.stats.malformed += 1,
            }
        } else if segment.end() > expected {
            let fresh = segment.payload.slice((expected - segment.seq) as usize..);
            self.deliver(&fresh)?;
            while let Some(ready) = self.buffer.pop_ready() {
                self.write_sink(&ready)?;
            }
        } else {
            self.stats.duplicates += 1;
        }

        let ack = AckSegment::new(self.buffer.expected_seq(), self.buffer.ranges());
        self.stats.acks_sent += 1;

        if self.eof_offset == Some(self.buffer.expected_seq()) {
            self.sink.flush()?;
            self.closed = true;
            info!(
                bytes = self.stats.bytes_delivered,
                segments = self.stats.segments_received,
                "stream complete"
            );
            return Ok(ReceiverAction::Close(ack));
        }

        Ok(ReceiverAction::Ack(ack))
    }

    fn deliver(&mut self, bytes: &[u8]) -> Result<(), TransferError> {
        self.buffer.advance(bytes.len() as u32);
        self.sink.write_all(bytes)?;
        self.stats.bytes_delivered += bytes.len() as u64;
        Ok(())
    }

    /// Write bytes already accounted for by `pop_ready`
    fn write_sink(&mut self, bytes: &[u8]) -> Result<(), TransferError> {
        self.sink.write_all(bytes)?;
        self.stats.bytes_delivered += bytes.len() as u64;
        Ok(())
    }
}
