//! Sending side of a transfer
//!
//! [`SenderPipeline`] slices a byte source into segments, keeps them in a
//! [`SendWindow`] until acknowledged and decides what to put on the wire in
//! response to ACKs and retransmission timeouts. It performs no I/O on the
//! network: every operation returns the [`Transmission`]s the driver must
//! send, and time is passed in by the caller.
//!
//! ```text
//!  Filling ⇄ Waiting ──(source exhausted, all acked)──▶ Draining ──▶ Closed
//! ```
//!
//! While draining, the EOF marker is repeated `eof_repeats` times, one copy
//! per `eof_interval`, through the same deadline as retransmissions.

use crate::ack::AckSegment;
use crate::buffer::SendWindow;
use crate::congestion::{CongestionController, CongestionEvent, CongestionStats};
use crate::connection::{SenderConfig, TransferError, WindowPolicy};
use crate::packet::{DataSegment, Packet, EOF_MARKER};
use crate::rtt::RttEstimator;
use bytes::Bytes;
use std::collections::VecDeque;
use std::io::Read;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Duplicate ACKs that trigger a fast retransmit
pub const DUP_ACK_THRESHOLD: u32 = 3;

/// Why a segment is being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitKind {
    /// First transmission of new data
    New,
    /// Retransmission after the third duplicate ACK
    FastRetransmit,
    /// Retransmission after the RTO expired
    TimeoutRetransmit,
    /// End-of-stream marker
    Eof,
}

/// A segment the driver must put on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    pub segment: DataSegment,
    pub kind: TransmitKind,
}

impl Transmission {
    fn new(seq: u32, payload: Bytes, kind: TransmitKind) -> Self {
        Transmission {
            segment: DataSegment::new(seq, payload),
            kind,
        }
    }

    /// Check if this is a retransmission
    pub fn is_retransmit(&self) -> bool {
        matches!(
            self.kind,
            TransmitKind::FastRetransmit | TransmitKind::TimeoutRetransmit
        )
    }
}

/// Sender lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// More data can be sent right now
    Filling,
    /// Window is full, or only unacknowledged data remains
    Waiting,
    /// Everything is acknowledged; EOF markers are being sent
    Draining,
    /// All EOF markers sent; nothing more will be transmitted
    Closed,
}

/// Sender statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// New data segments sent
    pub segments_sent: u64,
    /// Payload bytes sent for the first time
    pub bytes_sent: u64,
    /// Segments retransmitted (both kinds)
    pub retransmissions: u64,
    /// Fast retransmits
    pub fast_retransmits: u64,
    /// Retransmission timeouts
    pub timeouts: u64,
    /// ACKs processed
    pub acks_received: u64,
    /// Duplicate ACKs processed
    pub duplicate_acks: u64,
}

/// Sender pipeline reading the stream from `R`
pub struct SenderPipeline<R: Read> {
    source: R,
    config: SenderConfig,
    window: SendWindow,
    rtt: RttEstimator,
    congestion: CongestionController,
    state: SenderState,
    /// Chunks read from the source but not yet sent
    pending: VecDeque<Bytes>,
    source_exhausted: bool,
    dup_ack_count: u32,
    consecutive_timeouts: u32,
    last_timeout_at: Option<Instant>,
    eofs_sent: u32,
    next_eof_at: Option<Instant>,
    stats: SenderStats,
}

impl<R: Read> SenderPipeline<R> {
    /// Create a sender for `source`
    ///
    /// Fails if the configuration cannot make progress.
    pub fn new(source: R, config: SenderConfig) -> Result<Self, TransferError> {
        config.validate()?;

        let initial_ssthresh = match config.window {
            WindowPolicy::Congestion { initial_ssthresh } => initial_ssthresh,
            WindowPolicy::Fixed(_) => crate::congestion::DEFAULT_SSTHRESH,
        };

        Ok(SenderPipeline {
            source,
            window: SendWindow::new(0),
            rtt: RttEstimator::with_initial_rto(config.initial_rto),
            congestion: CongestionController::new(config.mss, initial_ssthresh),
            state: SenderState::Filling,
            pending: VecDeque::new(),
            source_exhausted: false,
            dup_ack_count: 0,
            consecutive_timeouts: 0,
            last_timeout_at: None,
            eofs_sent: 0,
            next_eof_at: None,
            stats: SenderStats::default(),
            config,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Whether the transfer has finished
    pub fn is_closed(&self) -> bool {
        self.state == SenderState::Closed
    }

    /// Bytes currently allowed in flight
    pub fn window_limit(&self) -> u32 {
        match self.config.window {
            WindowPolicy::Fixed(sws) => sws,
            WindowPolicy::Congestion { .. } => self.congestion.cwnd(),
        }
    }

    /// Unacknowledged bytes in flight
    pub fn flight_size(&self) -> u32 {
        self.window.flight_size()
    }

    /// Oldest unacknowledged byte
    pub fn base(&self) -> u32 {
        self.window.base()
    }

    /// Next byte offset to be sent
    pub fn next_seq(&self) -> u32 {
        self.window.next_seq()
    }

    /// Current retransmission timeout
    pub fn rto(&self) -> Duration {
        self.rtt.rto()
    }

    /// RTT estimator
    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    /// Congestion controller
    pub fn congestion(&self) -> &CongestionController {
        &self.congestion
    }

    /// Congestion controller snapshot
    pub fn congestion_stats(&self) -> CongestionStats {
        self.congestion.stats()
    }

    /// Duplicate ACKs seen for the current base
    pub fn dup_ack_count(&self) -> u32 {
        self.dup_ack_count
    }

    /// Sender statistics
    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Send whatever the window allows
    ///
    /// Once every byte is acknowledged this emits the first EOF marker; the
    /// remaining copies follow from [`on_timeout`](Self::on_timeout).
    pub fn poll_transmit(&mut self, now: Instant) -> Result<Vec<Transmission>, TransferError> {
        let mut out = self.fill(now)?;
        out.extend(self.next_eof(now));
        Ok(out)
    }

    /// Process one raw datagram from the receiver
    ///
    /// Anything that is not a well-formed ACK is dropped.
    pub fn on_datagram(
        &mut self,
        datagram: &[u8],
        now: Instant,
    ) -> Result<Vec<Transmission>, TransferError> {
        match Packet::from_bytes(datagram) {
            Ok(Packet::Ack(ack)) => self.on_ack(&ack, now),
            Ok(Packet::Data(segment)) => {
                debug!(seq = segment.seq, "stray data segment at sender dropped");
                Ok(Vec::new())
            }
            Err(e) => {
                debug!(error = %e, len = datagram.len(), "malformed datagram dropped");
                Ok(Vec::new())
            }
        }
    }

    /// Process one ACK
    pub fn on_ack(
        &mut self,
        ack: &AckSegment,
        now: Instant,
    ) -> Result<Vec<Transmission>, TransferError> {
        if matches!(self.state, SenderState::Draining | SenderState::Closed) {
            return Ok(Vec::new());
        }
        self.stats.acks_received += 1;

        let base = self.window.base();
        if ack.ack_number < base || ack.ack_number > self.window.next_seq() {
            debug!(
                ack = ack.ack_number,
                base,
                next_seq = self.window.next_seq(),
                "ACK outside window ignored"
            );
            return Ok(Vec::new());
        }

        for block in ack.sack_blocks() {
            self.window.mark_sacked(*block);
        }

        let mut out = Vec::new();

        if ack.ack_number > base {
            let retired = self.window.acknowledge_up_to(ack.ack_number);

            // Karn: only segments never retransmitted give a clean sample
            for (_, entry) in retired.iter().filter(|(_, entry)| entry.is_original()) {
                self.rtt.update(now.saturating_duration_since(entry.first_sent));
            }

            self.dup_ack_count = 0;
            self.consecutive_timeouts = 0;
            self.last_timeout_at = None;
            self.congestion.on_event(CongestionEvent::NewAck {
                acked_bytes: retired.len() as u32 * self.config.mss,
            });
        } else if !self.window.is_empty() {
            self.dup_ack_count += 1;
            self.stats.duplicate_acks += 1;

            if self.dup_ack_count == DUP_ACK_THRESHOLD {
                if let Some(t) = self.retransmit_base(now, TransmitKind::FastRetransmit) {
                    warn!(seq = t.segment.seq, "triple duplicate ACK, fast retransmit");
                    self.stats.fast_retransmits += 1;
                    out.push(t);
                }
                self.congestion.on_event(CongestionEvent::TripleDupAck);
            } else if self.dup_ack_count > DUP_ACK_THRESHOLD {
                self.congestion.on_event(CongestionEvent::WindowInflate);
            }
        }

        out.extend(self.fill(now)?);
        Ok(out)
    }

    /// Instant at which [`on_timeout`](Self::on_timeout) should next be called
    ///
    /// `None` while nothing is outstanding. While draining this is when the
    /// next EOF copy is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.state == SenderState::Draining {
            return self.next_eof_at;
        }
        if self.window.is_empty() {
            return None;
        }
        let oldest = self.window.oldest_unsacked_send_time()?;
        let anchor = match self.last_timeout_at {
            Some(at) => oldest.max(at),
            None => oldest,
        };
        Some(anchor + self.rtt.rto())
    }

    /// Handle the retransmission timer
    ///
    /// A call before the deadline is a no-op.
    pub fn on_timeout(&mut self, now: Instant) -> Result<Vec<Transmission>, TransferError> {
        match self.next_deadline() {
            Some(deadline) if now >= deadline => {}
            _ => return Ok(Vec::new()),
        }
        if self.state == SenderState::Draining {
            return Ok(self.next_eof(now).into_iter().collect());
        }

        self.consecutive_timeouts += 1;
        self.stats.timeouts += 1;
        if self.consecutive_timeouts > self.config.max_consecutive_timeouts {
            warn!(
                consecutive_timeouts = self.consecutive_timeouts,
                "giving up on unresponsive receiver"
            );
            return Err(TransferError::Unrecoverable {
                consecutive_timeouts: self.consecutive_timeouts,
            });
        }

        self.rtt.backoff();
        self.congestion.on_event(CongestionEvent::Timeout);
        self.dup_ack_count = 0;
        self.last_timeout_at = Some(now);

        let out: Vec<Transmission> = self
            .retransmit_base(now, TransmitKind::TimeoutRetransmit)
            .into_iter()
            .collect();

        warn!(
            base = self.window.base(),
            rto_ms = self.rtt.rto().as_millis() as u64,
            cwnd = self.congestion.cwnd(),
            consecutive = self.consecutive_timeouts,
            "retransmission timeout"
        );

        Ok(out)
    }

    /// Next EOF copy, if one is due
    fn next_eof(&mut self, now: Instant) -> Option<Transmission> {
        if self.state != SenderState::Draining {
            return None;
        }
        if matches!(self.next_eof_at, Some(at) if now < at) {
            return None;
        }

        let seq = self.window.next_seq();
        if self.eofs_sent == 0 {
            info!(
                bytes = seq,
                segments = self.stats.segments_sent,
                retransmissions = self.stats.retransmissions,
                "all data acknowledged, sending EOF"
            );
        }
        self.eofs_sent += 1;

        if self.eofs_sent >= self.config.eof_repeats {
            self.state = SenderState::Closed;
            self.next_eof_at = None;
        } else {
            self.next_eof_at = Some(now + self.config.eof_interval);
        }

        Some(Transmission::new(
            seq,
            Bytes::from_static(EOF_MARKER),
            TransmitKind::Eof,
        ))
    }

    fn retransmit_base(&mut self, now: Instant, kind: TransmitKind) -> Option<Transmission> {
        let seq = self.window.base_segment()?;
        let payload = self.window.get_for_retransmit(seq, now)?;
        self.stats.retransmissions += 1;
        Some(Transmission::new(seq, payload, kind))
    }

    /// Send new segments while the next one fits in the window
    fn fill(&mut self, now: Instant) -> Result<Vec<Transmission>, TransferError> {
        let mut out = Vec::new();
        if matches!(self.state, SenderState::Draining | SenderState::Closed) {
            return Ok(out);
        }

        let limit = self.window_limit();
        while let Some(len) = self.peek_chunk_len()? {
            if self.window.flight_size() + len > limit {
                break;
            }
            let Some(chunk) = self.pending.pop_front() else {
                break;
            };
            self.stats.segments_sent += 1;
            self.stats.bytes_sent += chunk.len() as u64;
            let seq = self.window.record_sent(chunk.clone(), now);
            out.push(Transmission::new(seq, chunk, TransmitKind::New));
        }

        self.refresh_state()?;
        Ok(out)
    }

    fn refresh_state(&mut self) -> Result<(), TransferError> {
        let next = self.peek_chunk_len()?;
        self.state = match next {
            None if self.window.is_empty() => SenderState::Draining,
            Some(len) if self.window.flight_size() + len <= self.window_limit() => {
                SenderState::Filling
            }
            _ => SenderState::Waiting,
        };
        Ok(())
    }

    /// Length of the next chunk to send, reading from the source if needed
    fn peek_chunk_len(&mut self) -> Result<Option<u32>, TransferError> {
        if self.pending.is_empty() && !self.source_exhausted {
            self.read_chunk()?;
        }
        Ok(self.pending.front().map(|chunk| chunk.len() as u32))
    }

    fn read_chunk(&mut self) -> Result<(), TransferError> {
        let mut buf = Vec::with_capacity(self.config.mss as usize);
        (&mut self.source)
            .take(self.config.mss as u64)
            .read_to_end(&mut buf)?;

        if buf.is_empty() {
            self.source_exhausted = true;
            debug!(total = self.window.next_seq(), "byte source exhausted");
        } else if buf == EOF_MARKER {
            // Never put the marker on the wire as data
            self.pending.push_back(Bytes::from_static(&EOF_MARKER[..2]));
            self.pending.push_back(Bytes::from_static(&EOF_MARKER[2..]));
        } else {
            self.pending.push_back(Bytes::from(buf));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::SackBlock;
    use crate::congestion::{CongestionPhase, DEFAULT_SSTHRESH};
    use crate::connection::DEFAULT_EOF_INTERVAL;
    use std::io::Cursor;

    const MSS: u32 = 1180;

    fn source(segments: usize) -> Cursor<Vec<u8>> {
        Cursor::new(
            (0..segments * MSS as usize)
                .map(|i| (i / MSS as usize) as u8)
                .collect(),
        )
    }

    fn congestion_sender(segments: usize) -> SenderPipeline<Cursor<Vec<u8>>> {
        SenderPipeline::new(source(segments), SenderConfig::default()).unwrap()
    }

    fn fixed_sender(segments: usize, sws: u32) -> SenderPipeline<Cursor<Vec<u8>>> {
        SenderPipeline::new(source(segments), SenderConfig::fixed_window(sws)).unwrap()
    }

    fn seqs(out: &[Transmission]) -> Vec<u32> {
        out.iter().map(|t| t.segment.seq).collect()
    }

    #[test]
    fn test_initial_window_is_one_segment() {
        let now = Instant::now();
        let mut tx = congestion_sender(10);

        let out = tx.poll_transmit(now).unwrap();
        assert_eq!(seqs(&out), vec![0]);
        assert_eq!(out[0].kind, TransmitKind::New);
        assert_eq!(tx.state(), SenderState::Waiting);
    }

    #[test]
    fn test_slow_start_doubles() {
        let now = Instant::now();
        let mut tx = congestion_sender(10);
        tx.poll_transmit(now).unwrap();

        let out = tx.on_ack(&AckSegment::cumulative(MSS), now).unwrap();
        assert_eq!(tx.congestion().cwnd(), 2 * MSS);
        assert_eq!(seqs(&out), vec![MSS, 2 * MSS]);

        let out = tx
            .on_ack(&AckSegment::cumulative(3 * MSS), now)
            .unwrap();
        assert_eq!(tx.congestion().cwnd(), 4 * MSS);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_fixed_window_bound() {
        let now = Instant::now();
        let mut tx = fixed_sender(20, 5 * MSS);

        let out = tx.poll_transmit(now).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(tx.flight_size(), 5 * MSS);

        // Controller still runs in fixed mode without limiting the window
        tx.on_ack(&AckSegment::cumulative(MSS), now).unwrap();
        assert_eq!(tx.window_limit(), 5 * MSS);
        assert_eq!(tx.flight_size(), 5 * MSS);
        assert_eq!(tx.congestion().cwnd(), 2 * MSS);
    }

    #[test]
    fn test_fast_retransmit_on_third_duplicate_only() {
        let now = Instant::now();
        let mut tx = fixed_sender(10, 8 * MSS);
        tx.poll_transmit(now).unwrap();
        tx.on_ack(&AckSegment::cumulative(MSS), now).unwrap();

        let dup = AckSegment::new(MSS, [SackBlock::new(2 * MSS, 3 * MSS)]);
        assert!(tx.on_ack(&dup, now).unwrap().is_empty());
        assert!(tx.on_ack(&dup, now).unwrap().is_empty());

        let out = tx.on_ack(&dup, now).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, TransmitKind::FastRetransmit);
        assert_eq!(out[0].segment.seq, MSS);
        assert_eq!(tx.congestion().phase(), CongestionPhase::FastRecovery);

        for _ in 0..5 {
            let out = tx.on_ack(&dup, now).unwrap();
            assert!(out.iter().all(|t| !t.is_retransmit()));
        }
        assert_eq!(tx.stats().fast_retransmits, 1);
    }

    #[test]
    fn test_karn_skips_retransmitted_sample() {
        let t0 = Instant::now();
        let mut tx = congestion_sender(4);
        tx.poll_transmit(t0).unwrap();

        let t1 = tx.next_deadline().unwrap();
        let out = tx.on_timeout(t1).unwrap();
        assert_eq!(out[0].kind, TransmitKind::TimeoutRetransmit);

        tx.on_ack(&AckSegment::cumulative(MSS), t1 + Duration::from_millis(50))
            .unwrap();
        assert_eq!(tx.rtt().sample_count(), 0);
    }

    #[test]
    fn test_rtt_sample_on_clean_ack() {
        let t0 = Instant::now();
        let mut tx = congestion_sender(4);
        tx.poll_transmit(t0).unwrap();

        tx.on_ack(&AckSegment::cumulative(MSS), t0 + Duration::from_millis(100))
            .unwrap();
        assert_eq!(tx.rtt().sample_count(), 1);
        // 100ms + 4 * 50ms
        assert!((tx.rto().as_secs_f64() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_rtt_sample_per_retired_segment() {
        let t0 = Instant::now();
        let mut tx = congestion_sender(10);
        tx.poll_transmit(t0).unwrap();
        tx.on_ack(&AckSegment::cumulative(MSS), t0 + Duration::from_millis(100))
            .unwrap();
        assert_eq!(tx.rtt().sample_count(), 1);

        // One cumulative ACK retiring both segments of the second round
        tx.on_ack(&AckSegment::cumulative(3 * MSS), t0 + Duration::from_millis(200))
            .unwrap();
        assert_eq!(tx.rtt().sample_count(), 3);
    }

    #[test]
    fn test_timeout_backoff_and_reset() {
        let t0 = Instant::now();
        let mut tx = congestion_sender(10);
        tx.poll_transmit(t0).unwrap();
        tx.on_ack(&AckSegment::cumulative(MSS), t0).unwrap();

        let deadline = tx.next_deadline().unwrap();
        assert!(tx.on_timeout(deadline - Duration::from_millis(1)).unwrap().is_empty());

        let rto_before = tx.rto();
        let out = tx.on_timeout(deadline).unwrap();
        assert_eq!(seqs(&out), vec![MSS]);
        assert_eq!(tx.congestion().cwnd(), MSS);
        assert_eq!(tx.congestion().phase(), CongestionPhase::SlowStart);
        assert!(tx.rto() > rto_before);

        // The next deadline is measured from the timeout, not back-to-back
        assert_eq!(tx.next_deadline(), Some(deadline + tx.rto()));
    }

    #[test]
    fn test_unrecoverable_after_consecutive_timeouts() {
        let mut now = Instant::now();
        let config = SenderConfig {
            max_consecutive_timeouts: 3,
            ..Default::default()
        };
        let mut tx = SenderPipeline::new(source(2), config).unwrap();
        tx.poll_transmit(now).unwrap();

        for _ in 0..3 {
            now = tx.next_deadline().unwrap();
            assert_eq!(tx.on_timeout(now).unwrap().len(), 1);
        }

        now = tx.next_deadline().unwrap();
        assert!(matches!(
            tx.on_timeout(now),
            Err(TransferError::Unrecoverable {
                consecutive_timeouts: 4
            })
        ));
    }

    #[test]
    fn test_ack_outside_window_ignored() {
        let now = Instant::now();
        let mut tx = congestion_sender(4);
        tx.poll_transmit(now).unwrap();

        assert!(tx
            .on_ack(&AckSegment::cumulative(5 * MSS), now)
            .unwrap()
            .is_empty());
        assert_eq!(tx.base(), 0);
        assert_eq!(tx.congestion().cwnd(), MSS);
    }

    #[test]
    fn test_eof_after_all_acked() {
        let now = Instant::now();
        let mut tx = fixed_sender(2, 4 * MSS);
        assert_eq!(tx.poll_transmit(now).unwrap().len(), 2);

        let out = tx.on_ack(&AckSegment::cumulative(2 * MSS), now).unwrap();
        assert!(out.is_empty());
        assert_eq!(tx.state(), SenderState::Draining);
        assert_eq!(tx.next_deadline(), None);

        let mut eofs = tx.poll_transmit(now).unwrap();
        assert_eq!(eofs.len(), 1);
        assert_eq!(tx.state(), SenderState::Draining);

        // Later copies are paced by the deadline, not sent back-to-back
        let mut at = now;
        while !tx.is_closed() {
            assert!(tx.poll_transmit(at).unwrap().is_empty());
            let deadline = tx.next_deadline().unwrap();
            assert_eq!(deadline, at + DEFAULT_EOF_INTERVAL);
            assert!(tx.on_timeout(deadline - Duration::from_millis(1)).unwrap().is_empty());

            at = deadline;
            eofs.extend(tx.on_timeout(at).unwrap());
        }

        assert_eq!(eofs.len(), 5);
        assert!(eofs
            .iter()
            .all(|t| t.kind == TransmitKind::Eof && t.segment.is_eof() && t.segment.seq == 2 * MSS));
        assert_eq!(tx.next_deadline(), None);
        assert!(tx.poll_transmit(at).unwrap().is_empty());
        assert_eq!(tx.stats().timeouts, 0);
    }

    #[test]
    fn test_empty_source() {
        let mut tx =
            SenderPipeline::new(Cursor::new(Vec::new()), SenderConfig::default()).unwrap();
        let out = tx.poll_transmit(Instant::now()).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].segment, DataSegment::eof(0));
        assert_eq!(tx.state(), SenderState::Draining);
    }

    #[test]
    fn test_single_eof_closes_immediately() {
        let config = SenderConfig {
            eof_repeats: 1,
            ..Default::default()
        };
        let mut tx = SenderPipeline::new(Cursor::new(Vec::new()), config).unwrap();

        assert_eq!(tx.poll_transmit(Instant::now()).unwrap().len(), 1);
        assert!(tx.is_closed());
        assert_eq!(tx.next_deadline(), None);
    }

    #[test]
    fn test_eof_shaped_data_split() {
        let now = Instant::now();
        let mut tx =
            SenderPipeline::new(Cursor::new(b"EOF".to_vec()), SenderConfig::fixed_window(MSS))
                .unwrap();

        let out = tx.poll_transmit(now).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].segment.payload.as_ref(), b"EO");
        assert_eq!(out[1].segment.payload.as_ref(), b"F");
        assert!(out.iter().all(|t| !t.segment.is_eof()));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = SenderPipeline::new(source(1), SenderConfig::fixed_window(100));
        assert!(matches!(result, Err(TransferError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_datagram_ignored() {
        let now = Instant::now();
        let mut tx = congestion_sender(2);
        tx.poll_transmit(now).unwrap();

        assert!(tx.on_datagram(&[1, 2, 3], now).unwrap().is_empty());
        assert!(tx
            .on_datagram(&DataSegment::new(0, Bytes::from_static(b"x")).to_bytes(), now)
            .unwrap()
            .is_empty());
        assert_eq!(tx.stats().acks_received, 0);

        let out = tx
            .on_datagram(&AckSegment::cumulative(MSS).to_bytes(), now)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(tx.congestion_stats().ssthresh, DEFAULT_SSTHRESH);
    }
}
