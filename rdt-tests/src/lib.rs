//! Shared helpers for RDT integration tests
//!
//! [`simulate`] runs a sender and a receiver pipeline against each other over
//! a virtual-time link. No sockets or sleeps are involved, so fault patterns
//! replay exactly.

use rdt_io::Delivery;
use rdt_protocol::{
    ReceiverAction, ReceiverConfig, ReceiverPipeline, ReceiverStats, SenderConfig,
    SenderPipeline, SenderStats, TransferError, TransmitKind, Transmission,
};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::Cursor;
use std::time::{Duration, Instant};

/// Upper bound on simulation steps before giving up
pub const MAX_STEPS: usize = 200_000;

/// Deterministic, non-repeating-looking test data
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + i / 251) as u8).collect()
}

/// Which way a datagram travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Direction {
    /// Data and EOF segments
    ToReceiver,
    /// ACKs
    ToSender,
}

/// Virtual link timing
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// Delay applied to every delivered datagram
    pub one_way_delay: Duration,
    /// Extra delay for datagrams the fault model holds back
    pub hold_delay: Duration,
    /// Receiver settings
    pub receiver: ReceiverConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            one_way_delay: Duration::from_millis(10),
            hold_delay: Duration::from_millis(25),
            receiver: ReceiverConfig::default(),
        }
    }
}

/// Result of a simulated transfer
#[derive(Debug)]
pub struct TransferOutcome {
    /// Bytes written to the receiver's sink
    pub received: Vec<u8>,
    /// Whether the receiver saw the complete stream
    pub receiver_closed: bool,
    /// Whether the sender finished
    pub sender_closed: bool,
    /// Sender counters
    pub sender: SenderStats,
    /// Receiver counters
    pub receiver: ReceiverStats,
    /// Times new data was sent while flight exceeded the window limit
    pub window_violations: usize,
    /// Virtual time taken
    pub elapsed: Duration,
}

type Wire = BinaryHeap<Reverse<(Instant, u64, Direction, Vec<u8>)>>;

struct Link<F> {
    wire: Wire,
    next_id: u64,
    config: LinkConfig,
    fault: F,
}

impl<F: FnMut(Direction, &[u8]) -> Delivery> Link<F> {
    fn send(&mut self, now: Instant, direction: Direction, datagram: Vec<u8>) {
        let at = now + self.config.one_way_delay;
        match (self.fault)(direction, &datagram) {
            Delivery::Drop => {}
            Delivery::Deliver => self.push(at, direction, datagram),
            Delivery::Duplicate => {
                self.push(at, direction, datagram.clone());
                self.push(at, direction, datagram);
            }
            Delivery::Hold => self.push(at + self.config.hold_delay, direction, datagram),
        }
    }

    fn push(&mut self, at: Instant, direction: Direction, datagram: Vec<u8>) {
        self.next_id += 1;
        self.wire
            .push(Reverse((at, self.next_id, direction, datagram)));
    }
}

/// Transfer `data` through a virtual link whose faults are decided by `fault`
///
/// Runs until both sides are done or nothing is left to happen.
pub fn simulate<F>(
    data: &[u8],
    sender_config: SenderConfig,
    link: LinkConfig,
    fault: F,
) -> Result<TransferOutcome, TransferError>
where
    F: FnMut(Direction, &[u8]) -> Delivery,
{
    let start = Instant::now();
    let mut now = start;
    let mut sender = SenderPipeline::new(Cursor::new(data.to_vec()), sender_config)?;
    let mut receiver = ReceiverPipeline::new(Vec::new(), link.receiver);
    let mut link = Link {
        wire: BinaryHeap::new(),
        next_id: 0,
        config: link,
        fault,
    };
    let mut window_violations = 0;

    let mut emit = |link: &mut Link<F>,
                    sender: &SenderPipeline<Cursor<Vec<u8>>>,
                    now: Instant,
                    out: Vec<Transmission>| {
        if out.iter().any(|t| t.kind == TransmitKind::New)
            && sender.flight_size() > sender.window_limit()
        {
            window_violations += 1;
        }
        for t in out {
            link.send(now, Direction::ToReceiver, t.segment.to_bytes().to_vec());
        }
    };

    let out = sender.poll_transmit(now)?;
    emit(&mut link, &sender, now, out);

    for _ in 0..MAX_STEPS {
        if sender.is_closed() && receiver.is_closed() {
            break;
        }

        let next_wire = link.wire.peek().map(|Reverse((at, ..))| *at);
        let deadline = sender.next_deadline();
        let wire_first = match (next_wire, deadline) {
            (Some(w), Some(d)) => w <= d,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        if wire_first {
            let Some(Reverse((at, _, direction, datagram))) = link.wire.pop() else {
                break;
            };
            now = now.max(at);
            match direction {
                Direction::ToReceiver => match receiver.on_datagram(&datagram)? {
                    ReceiverAction::Ack(ack) | ReceiverAction::Close(ack) => {
                        link.send(now, Direction::ToSender, ack.to_bytes().to_vec());
                    }
                    ReceiverAction::Ignored => {}
                },
                Direction::ToSender => {
                    let out = sender.on_datagram(&datagram, now)?;
                    emit(&mut link, &sender, now, out);
                }
            }
        } else if let Some(deadline) = deadline {
            now = now.max(deadline);
            let out = sender.on_timeout(now)?;
            emit(&mut link, &sender, now, out);
        }

        let out = sender.poll_transmit(now)?;
        emit(&mut link, &sender, now, out);
    }

    Ok(TransferOutcome {
        receiver_closed: receiver.is_closed(),
        sender_closed: sender.is_closed(),
        sender: sender.stats().clone(),
        receiver: receiver.stats().clone(),
        window_violations,
        elapsed: now - start,
        received: receiver.into_sink(),
    })
}

/// Fault model that delivers everything
pub fn perfect(_: Direction, _: &[u8]) -> Delivery {
    Delivery::Deliver
}

/// Sequence number of a data datagram, if it is one
pub fn data_seq(datagram: &[u8]) -> Option<u32> {
    match rdt_protocol::Packet::from_bytes(datagram) {
        Ok(rdt_protocol::Packet::Data(segment)) => Some(segment.seq),
        _ => None,
    }
}
