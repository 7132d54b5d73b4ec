//! ACK segments and selective acknowledgment blocks
//!
//! An ACK carries the cumulative next-expected byte in the sequence field and
//! a count-prefixed list of SACK blocks in the reserved region. With a 16-byte
//! region and 8 bytes per block only one block fits; extra ranges known to the
//! receiver are simply not reported.

use crate::packet::{check_header, PacketError, HEADER_SIZE, RESERVED_SIZE};
use bytes::{Buf, BufMut, BytesMut};

/// Encoded size of one SACK block (start + end)
pub const SACK_BLOCK_SIZE: usize = 8;

/// Number of SACK blocks that fit after the count byte
pub const MAX_SACK_BLOCKS: usize = (RESERVED_SIZE - 1) / SACK_BLOCK_SIZE;

/// Half-open byte range `[start, end)` held by the receiver out of order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SackBlock {
    /// First byte offset in the range
    pub start: u32,
    /// Offset one past the last byte in the range
    pub end: u32,
}

impl SackBlock {
    /// Create a new SACK block
    pub fn new(start: u32, end: u32) -> Self {
        SackBlock { start, end }
    }

    /// Number of bytes in the range
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Check if the range is empty
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check if `[seq, end)` lies entirely within this block
    pub fn covers(&self, seq: u32, end: u32) -> bool {
        self.start <= seq && end <= self.end
    }
}

/// Acknowledgment segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckSegment {
    /// Next expected byte (everything below has been delivered)
    pub ack_number: u32,
    sack_blocks: Vec<SackBlock>,
}

impl AckSegment {
    /// Create an ACK, keeping at most [`MAX_SACK_BLOCKS`] of the given blocks
    ///
    /// Blocks are kept in the order given; receivers pass them lowest first
    /// so the range closest to the hole is the one reported.
    pub fn new(ack_number: u32, sack_blocks: impl IntoIterator<Item = SackBlock>) -> Self {
        AckSegment {
            ack_number,
            sack_blocks: sack_blocks
                .into_iter()
                .filter(|b| !b.is_empty())
                .take(MAX_SACK_BLOCKS)
                .collect(),
        }
    }

    /// Create a purely cumulative ACK
    pub fn cumulative(ack_number: u32) -> Self {
        AckSegment {
            ack_number,
            sack_blocks: Vec::new(),
        }
    }

    /// Selective acknowledgment blocks carried by this ACK
    pub fn sack_blocks(&self) -> &[SackBlock] {
        &self.sack_blocks
    }

    /// Serialize the ACK to bytes
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);

        buf.put_u32(self.ack_number);
        buf.put_u8(self.sack_blocks.len() as u8);
        for block in &self.sack_blocks {
            buf.put_u32(block.start);
            buf.put_u32(block.end);
        }
        buf.put_bytes(0, HEADER_SIZE - buf.len());

        buf
    }

    /// Parse an ACK from bytes
    ///
    /// Bytes past the header are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        check_header(bytes)?;

        let mut buf = &bytes[..HEADER_SIZE];
        let ack_number = buf.get_u32();
        let count = buf.get_u8() as usize;

        if 1 + count * SACK_BLOCK_SIZE > RESERVED_SIZE {
            return Err(PacketError::SackOverrun {
                count,
                max: MAX_SACK_BLOCKS,
            });
        }

        let mut sack_blocks = Vec::with_capacity(count);
        for _ in 0..count {
            let start = buf.get_u32();
            let end = buf.get_u32();
            if start >= end {
                return Err(PacketError::InvalidSackBlock { start, end });
            }
            sack_blocks.push(SackBlock { start, end });
        }

        Ok(AckSegment {
            ack_number,
            sack_blocks,
        })
    }
}
