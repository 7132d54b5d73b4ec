//! Send window and receive reassembly buffer
//!
//! Both are keyed by byte offset. The send window keeps every unacknowledged
//! segment for retransmission; the receive buffer keeps segments that arrived
//! ahead of the next expected byte.

use crate::ack::SackBlock;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::time::Instant;

/// Unacknowledged segment held by the sender
#[derive(Debug, Clone)]
pub struct InFlight {
    /// The payload, kept for retransmission
    pub payload: Bytes,
    /// Time when the segment was first sent
    pub first_sent: Instant,
    /// Time when the segment was last (re)sent
    pub last_sent: Instant,
    /// Number of times this segment has been sent
    pub transmissions: u32,
    /// Whether the receiver reported holding it out of order
    pub sacked: bool,
}

impl InFlight {
    /// Payload length in bytes
    pub fn len(&self) -> u32 {
        self.payload.len() as u32
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Whether this segment was only ever sent once (usable for RTT samples)
    pub fn is_original(&self) -> bool {
        self.transmissions == 1
    }
}

/// Sliding send window
///
/// ```text
///  base              next_seq
///   │                   │
///  ─┼───────────────────┼──────────────▶ byte offsets
///   │ <── in flight ──> │ <── unsent ──>
/// ```
#[derive(Debug)]
pub struct SendWindow {
    /// Oldest unacknowledged byte
    base: u32,
    /// Next byte to send
    next_seq: u32,
    /// Unacknowledged segments keyed by offset
    in_flight: BTreeMap<u32, InFlight>,
}

impl SendWindow {
    /// Create an empty window starting at `initial_seq`
    pub fn new(initial_seq: u32) -> Self {
        SendWindow {
            base: initial_seq,
            next_seq: initial_seq,
            in_flight: BTreeMap::new(),
        }
    }

    /// Oldest unacknowledged byte
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Next byte to send
    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Bytes sent but not yet cumulatively acknowledged
    pub fn flight_size(&self) -> u32 {
        self.next_seq - self.base
    }

    /// Number of unacknowledged segments
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Check if nothing is outstanding
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Record a new segment starting at `next_seq`
    ///
    /// Returns the offset assigned to the segment.
    pub fn record_sent(&mut self, payload: Bytes, now: Instant) -> u32 {
        let seq = self.next_seq;
        self.next_seq += payload.len() as u32;
        self.in_flight.insert(
            seq,
            InFlight {
                payload,
                first_sent: now,
                last_sent: now,
                transmissions: 1,
                sacked: false,
            },
        );
        seq
    }

    /// Get the in-flight segment at `seq`
    pub fn get(&self, seq: u32) -> Option<&InFlight> {
        self.in_flight.get(&seq)
    }

    /// Offset of the segment holding the byte at `base`
    pub fn base_segment(&self) -> Option<u32> {
        self.in_flight
            .range(..=self.base)
            .next_back()
            .filter(|(seq, entry)| **seq + entry.len() > self.base)
            .map(|(seq, _)| *seq)
            .or_else(|| self.in_flight.keys().next().copied())
    }

    /// Take a segment for retransmission, updating its send metadata
    pub fn get_for_retransmit(&mut self, seq: u32, now: Instant) -> Option<Bytes> {
        self.in_flight.get_mut(&seq).map(|entry| {
            entry.last_sent = now;
            entry.transmissions += 1;
            entry.payload.clone()
        })
    }

    /// Retire every segment fully covered by cumulative `ack` and move `base`
    ///
    /// Returns the retired segments in offset order.
    pub fn acknowledge_up_to(&mut self, ack: u32) -> Vec<(u32, InFlight)> {
        let mut retired = Vec::new();

        while let Some(entry) = self.in_flight.first_entry() {
            if *entry.key() + entry.get().len() > ack {
                break;
            }
            let seq = *entry.key();
            retired.push((seq, entry.remove()));
        }

        if ack > self.base {
            self.base = ack.min(self.next_seq);
        }

        retired
    }

    /// Mark every segment inside `block` as selectively acknowledged
    ///
    /// Returns the number of newly marked segments.
    pub fn mark_sacked(&mut self, block: SackBlock) -> usize {
        let mut marked = 0;
        for (seq, entry) in self.in_flight.range_mut(block.start..block.end) {
            if !entry.sacked && block.covers(*seq, *seq + entry.len()) {
                entry.sacked = true;
                marked += 1;
            }
        }
        marked
    }

    /// Earliest last-send time among segments not selectively acknowledged
    ///
    /// Falls back to the earliest of all segments when every one is SACKed.
    pub fn oldest_unsacked_send_time(&self) -> Option<Instant> {
        self.in_flight
            .values()
            .filter(|entry| !entry.sacked)
            .map(|entry| entry.last_sent)
            .min()
            .or_else(|| self.in_flight.values().map(|entry| entry.last_sent).min())
    }

    /// Iterate over in-flight segments in offset order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &InFlight)> {
        self.in_flight.iter().map(|(seq, entry)| (*seq, entry))
    }
}

/// Result of offering an out-of-order segment to the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New bytes were stored
    Buffered,
    /// Every byte was already delivered or buffered
    Duplicate,
    /// Buffer at capacity; segment dropped
    Full,
    /// Segment ends past the sequence space; segment dropped
    Overflow,
}

/// Out-of-order reassembly buffer
///
/// Stored segments never overlap: overlapping input is trimmed against what
/// is already held.
#[derive(Debug)]
pub struct ReceiveBuffer {
    /// Next contiguous byte expected
    expected_seq: u32,
    /// Segments held ahead of `expected_seq`
    segments: BTreeMap<u32, Bytes>,
    /// Maximum number of stored segments
    max_segments: usize,
}

impl ReceiveBuffer {
    /// Create a new receive buffer
    pub fn new(initial_seq: u32, max_segments: usize) -> Self {
        ReceiveBuffer {
            expected_seq: initial_seq,
            segments: BTreeMap::new(),
            max_segments,
        }
    }

    /// Next contiguous byte expected
    pub fn expected_seq(&self) -> u32 {
        self.expected_seq
    }

    /// Number of stored segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total buffered bytes
    pub fn buffered_bytes(&self) -> usize {
        self.segments.values().map(Bytes::len).sum()
    }

    /// Advance past `len` bytes delivered in order
    pub fn advance(&mut self, len: u32) {
        self.expected_seq += len;
    }

    /// Store a segment that starts beyond `expected_seq`
    pub fn insert(&mut self, seq: u32, payload: Bytes) -> InsertOutcome {
        let Some(mut end) = seq.checked_add(payload.len() as u32) else {
            return InsertOutcome::Overflow;
        };
        let mut start = seq.max(self.expected_seq);
        if start >= end {
            return InsertOutcome::Duplicate;
        }

        // Trim against the segment starting at or before us
        if let Some((&prev_seq, prev)) = self.segments.range(..=start).next_back() {
            let prev_end = stored_end(prev_seq, prev);
            if prev_end >= end {
                return InsertOutcome::Duplicate;
            }
            start = start.max(prev_end);
        }

        // Swallow segments we fully cover; stop at one that extends past us
        let following: Vec<(u32, u32)> = self
            .segments
            .range(start..end)
            .map(|(&s, p)| (s, stored_end(s, p)))
            .collect();
        let mut swallowed = Vec::new();
        for (next_seq, next_end) in following {
            if next_end <= end {
                swallowed.push(next_seq);
            } else {
                end = next_seq;
                break;
            }
        }

        if start >= end {
            return InsertOutcome::Duplicate;
        }
        if self.segments.len() - swallowed.len() >= self.max_segments {
            return InsertOutcome::Full;
        }

        for s in swallowed {
            self.segments.remove(&s);
        }
        let offset = (start - seq) as usize;
        let len = (end - start) as usize;
        self.segments
            .insert(start, payload.slice(offset..offset + len));

        InsertOutcome::Buffered
    }

    /// Pop the buffered bytes that now start at `expected_seq`, advancing it
    ///
    /// Anything left behind `expected_seq` is discarded first.
    pub fn pop_ready(&mut self) -> Option<Bytes> {
        loop {
            let mut entry = self.segments.first_entry()?;
            let seq = *entry.key();
            let end = stored_end(seq, entry.get());

            if seq > self.expected_seq {
                return None;
            }
            if end <= self.expected_seq {
                entry.remove();
                continue;
            }

            let payload = entry.remove();
            let ready = payload.slice((self.expected_seq - seq) as usize..);
            self.expected_seq = end;
            return Some(ready);
        }
    }

    /// Buffered ranges with adjacent segments coalesced, lowest first
    pub fn ranges(&self) -> Vec<SackBlock> {
        let mut ranges: Vec<SackBlock> = Vec::new();
        for (&seq, payload) in &self.segments {
            let end = stored_end(seq, payload);
            match ranges.last_mut() {
                Some(last) if last.end == seq => last.end = end,
                _ => ranges.push(SackBlock::new(seq, end)),
            }
        }
        ranges
    }
}

/// End offset of a stored segment; `insert` guarantees it fits
fn stored_end(seq: u32, payload: &Bytes) -> u32 {
    seq.saturating_add(payload.len() as u32)
}
