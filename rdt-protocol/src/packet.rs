//! RDT Packet Structures and Serialization
//!
//! Every datagram starts with a fixed 20-byte header: a 32-bit sequence (data)
//! or acknowledgment (ACK) number followed by a 16-byte reserved region. Data
//! segments carry their payload after the header; ACKs carry SACK blocks in
//! the reserved region and no payload.
//!
//! ```text
//! bytes 0..4   sequence/ack number (u32, big-endian)
//! bytes 4..20  reserved: [sack_count:1][(start:u32,end:u32)...] or zero
//! bytes 20..N  payload (0..1180 bytes)
//! ```

use crate::ack::AckSegment;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

/// Size of the sequence/ack number field in bytes
pub const SEQ_FIELD_SIZE: usize = 4;

/// Size of the reserved (SACK) region in bytes
pub const RESERVED_SIZE: usize = 16;

/// Size of the packet header in bytes
pub const HEADER_SIZE: usize = SEQ_FIELD_SIZE + RESERVED_SIZE;

/// Largest datagram put on the wire
pub const MAX_DATAGRAM_SIZE: usize = 1200;

/// Maximum payload size (MSS): datagram limit minus header
pub const MAX_PAYLOAD_SIZE: usize = MAX_DATAGRAM_SIZE - HEADER_SIZE;

/// Payload of the end-of-stream segment
pub const EOF_MARKER: &[u8] = b"EOF";

/// Data segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    /// Byte offset of the first payload byte within the stream
    pub seq: u32,
    /// Payload data
    pub payload: Bytes,
}

impl DataSegment {
    /// Create a new data segment
    pub fn new(seq: u32, payload: Bytes) -> Self {
        DataSegment { seq, payload }
    }

    /// Create the end-of-stream marker segment at `seq`
    pub fn eof(seq: u32) -> Self {
        DataSegment {
            seq,
            payload: Bytes::from_static(EOF_MARKER),
        }
    }

    /// Whether this segment carries the end-of-stream marker
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.payload.as_ref() == EOF_MARKER
    }

    /// Payload length in bytes
    #[inline]
    pub fn len(&self) -> u32 {
        self.payload.len() as u32
    }

    /// Whether the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Offset one past the last payload byte
    #[inline]
    pub fn end(&self) -> u32 {
        self.seq.saturating_add(self.len())
    }

    /// Offset one past the last payload byte, if it fits the sequence space
    #[inline]
    pub fn checked_end(&self) -> Option<u32> {
        self.seq.checked_add(self.len())
    }

    /// Whether the payload runs past the end of the sequence space
    ///
    /// The EOF marker carries no stream bytes and never overflows.
    pub fn overflows(&self) -> bool {
        !self.is_eof() && self.checked_end().is_none()
    }

    /// Total size of the segment on the wire (header + payload)
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Serialize the segment to bytes
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());
        buf.put_u32(self.seq);
        buf.put_bytes(0, RESERVED_SIZE);
        buf.put_slice(&self.payload);
        buf
    }

    /// Parse a data segment from bytes
    ///
    /// The reserved region is ignored on data segments.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        check_header(bytes)?;

        let payload_len = bytes.len() - HEADER_SIZE;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = &bytes[..SEQ_FIELD_SIZE];
        let segment = DataSegment {
            seq: buf.get_u32(),
            payload: Bytes::copy_from_slice(&bytes[HEADER_SIZE..]),
        };
        if segment.overflows() {
            return Err(PacketError::SequenceOverflow {
                seq: segment.seq,
                len: payload_len,
            });
        }
        Ok(segment)
    }
}

pub(crate) fn check_header(bytes: &[u8]) -> Result<(), PacketError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PacketError::InsufficientData {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Unified packet type (either data or acknowledgment)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Data(DataSegment),
    Ack(AckSegment),
}

impl Packet {
    /// Check if this is a data segment
    pub fn is_data(&self) -> bool {
        matches!(self, Packet::Data(_))
    }

    /// Check if this is an acknowledgment
    pub fn is_ack(&self) -> bool {
        matches!(self, Packet::Ack(_))
    }

    /// Packet type discriminator
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Data(_) => PacketType::Data,
            Packet::Ack(_) => PacketType::Ack,
        }
    }

    /// Total size of the packet
    pub fn size(&self) -> usize {
        match self {
            Packet::Data(p) => p.size(),
            Packet::Ack(_) => HEADER_SIZE,
        }
    }

    /// Serialize the packet to bytes
    pub fn to_bytes(&self) -> BytesMut {
        match self {
            Packet::Data(p) => p.to_bytes(),
            Packet::Ack(p) => p.to_bytes(),
        }
    }

    /// Parse a packet from bytes
    ///
    /// A bare header is an ACK; anything longer is a data segment, since the
    /// sender never emits empty data segments.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        check_header(bytes)?;

        if bytes.len() == HEADER_SIZE {
            Ok(Packet::Ack(AckSegment::from_bytes(bytes)?))
        } else {
            Ok(Packet::Data(DataSegment::from_bytes(bytes)?))
        }
    }
}

/// Packet type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Data,
    Ack,
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::Data => write!(f, "Data"),
            PacketType::Ack => write!(f, "Ack"),
        }
    }
}

/// Packet parsing and validation errors
///
/// Every variant is a malformed packet: receivers drop the datagram and rely
/// on retransmission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("SACK count {count} overruns the reserved region (max {max})")]
    SackOverrun { count: usize, max: usize },

    #[error("Invalid SACK block [{start}, {end})")]
    InvalidSackBlock { start: u32, end: u32 },

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Segment at {seq} with {len} bytes overflows the sequence space")]
    SequenceOverflow { seq: u32, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::SackBlock;

    #[test]
    fn test_header_layout() {
        let segment = DataSegment::new(0x0102_0304, Bytes::from_static(b"abc"));
        let bytes = segment.to_bytes();

        assert_eq!(bytes.len(), HEADER_SIZE + 3);
        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
        assert!(bytes[4..HEADER_SIZE].iter().all(|&b| b == 0));
        assert_eq!(&bytes[HEADER_SIZE..], b"abc");
    }

    #[test]
    fn test_data_segment_serialization() {
        let payload = Bytes::from(vec![7u8; MAX_PAYLOAD_SIZE]);
        let segment = DataSegment::new(1180, payload.clone());
        let bytes = segment.to_bytes();

        assert_eq!(bytes.len(), MAX_DATAGRAM_SIZE);

        let decoded = DataSegment::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.seq, 1180);
        assert_eq!(decoded.payload, payload);
        assert_eq!(decoded.end(), 2360);
    }

    #[test]
    fn test_eof_segment() {
        let eof = DataSegment::eof(500);
        assert!(eof.is_eof());
        assert_eq!(eof.len(), 3);

        let data = DataSegment::new(500, Bytes::from_static(b"EOFX"));
        assert!(!data.is_eof());
    }

    #[test]
    fn test_too_short() {
        let err = Packet::from_bytes(&[0u8; 19]).unwrap_err();
        assert_eq!(
            err,
            PacketError::InsufficientData {
                expected: HEADER_SIZE,
                actual: 19
            }
        );

        // The 1-byte handshake request is never a packet
        assert!(Packet::from_bytes(&[1]).is_err());
    }

    #[test]
    fn test_sequence_overflow_rejected() {
        let segment = DataSegment::new(u32::MAX - 10, Bytes::from(vec![1u8; 100]));
        assert_eq!(
            DataSegment::from_bytes(&segment.to_bytes()),
            Err(PacketError::SequenceOverflow {
                seq: u32::MAX - 10,
                len: 100
            })
        );

        // Ending exactly at the top of the space is fine
        let edge = DataSegment::new(u32::MAX - 100, Bytes::from(vec![1u8; 100]));
        assert_eq!(DataSegment::from_bytes(&edge.to_bytes()), Ok(edge));

        let eof = DataSegment::eof(u32::MAX);
        assert!(DataSegment::from_bytes(&eof.to_bytes()).unwrap().is_eof());
    }

    #[test]
    fn test_payload_too_large() {
        let bytes = vec![0u8; MAX_DATAGRAM_SIZE + 1];
        assert!(matches!(
            DataSegment::from_bytes(&bytes),
            Err(PacketError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_packet_auto_detect() {
        let data = DataSegment::new(100, Bytes::from_static(b"test"));
        let packet = Packet::from_bytes(&data.to_bytes()).unwrap();
        assert!(packet.is_data());
        assert_eq!(packet.packet_type(), PacketType::Data);

        let ack = AckSegment::new(100, [SackBlock::new(200, 300)]);
        let packet = Packet::from_bytes(&ack.to_bytes()).unwrap();
        assert!(packet.is_ack());
        assert_eq!(packet.size(), HEADER_SIZE);
        assert_eq!(packet, Packet::Ack(ack));
    }
}
