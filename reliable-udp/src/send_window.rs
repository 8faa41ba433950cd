//! Sliding-window send-side state machine.
//!
//! [`SendWindow`] owns the queue of in-flight packets for one session and
//! emits new packets from local input while the window has room.
//!
//! # Protocol contract
//!
//! - Sequence numbers count **packets**, start at 1 and never wrap; the EOF
//!   marker consumes one sequence number like any data packet.  A session is
//!   therefore limited to `u32::MAX - 1` packets (about 2 TB at full
//!   payloads); past that `snd_nxt` overflows.
//! - At most `capacity` packets may be in flight at once:
//!   `snd_nxt - snd_una <= capacity`.
//! - ACKs are **cumulative**: `ackno = K` confirms every packet with
//!   `seqno < K`.
//! - Retransmission is per packet on a fixed timeout; see
//!   [`crate::timer::RetransmitTimer`].

use std::collections::VecDeque;
use std::time::Instant;

use crate::conn::{Conn, Input};
use crate::packet::{Packet, MAX_PAYLOAD};

/// A transmitted packet awaiting acknowledgement.
#[derive(Debug, Clone)]
pub struct InFlight {
    pub seqno: u32,
    /// Encoded datagram; retransmissions resend these exact bytes.
    pub wire: Vec<u8>,
    /// Total number of times this packet has been transmitted.
    pub tx_count: u32,
    /// Time of the most recent (re)transmission.
    pub last_sent: Instant,
}

/// Send-side state for one session.
///
/// ```text
///  snd_una            snd_nxt
///      │                  │
///  ────┼──────────────────┼──────────────────▶ seq space
///      │ <── in flight ──▶│ <── sendable ───▶
/// ```
#[derive(Debug)]
pub struct SendWindow {
    /// Oldest unacknowledged sequence number (left window edge).
    pub snd_una: u32,

    /// Sequence number for the next new packet.
    pub snd_nxt: u32,

    capacity: usize,

    /// In-flight packets ordered by sequence number (front = oldest).
    queue: VecDeque<InFlight>,

    eof_sent: bool,
}

impl SendWindow {
    /// Create an empty window.  `capacity` must be at least 1.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be at least 1");
        Self {
            snd_una: 1,
            snd_nxt: 1,
            capacity,
            queue: VecDeque::with_capacity(capacity),
            eof_sent: false,
        }
    }

    /// Number of packets sent but not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        (self.snd_nxt - self.snd_una) as usize
    }

    /// `true` when a new packet may be emitted.
    pub fn can_send(&self) -> bool {
        !self.eof_sent && self.in_flight() < self.capacity
    }

    /// `true` once every emitted packet has been acknowledged.
    pub fn is_drained(&self) -> bool {
        self.snd_una == self.snd_nxt
    }

    /// `true` once the local EOF marker has been emitted.
    pub fn eof_sent(&self) -> bool {
        self.eof_sent
    }

    /// Process a cumulative ACK.
    ///
    /// Advances `snd_una` and purges every queued packet below `ackno`.
    /// Returns the number of purged packets; `0` for a duplicate, stale, or
    /// out-of-range ACK.
    pub fn on_ack(&mut self, ackno: u32) -> usize {
        if ackno <= self.snd_una {
            return 0;
        }
        if ackno > self.snd_nxt {
            log::warn!(
                "[rel] ignoring ACK {} beyond snd_nxt {}",
                ackno,
                self.snd_nxt
            );
            return 0;
        }

        self.snd_una = ackno;
        let before = self.queue.len();
        while self.queue.front().is_some_and(|e| e.seqno < ackno) {
            self.queue.pop_front();
        }
        before - self.queue.len()
    }

    /// Emit new packets from local input while the window has room.
    ///
    /// Stops when the window is full, when the source has nothing ready, or
    /// after the EOF marker has been sent.  Returns the number of packets
    /// emitted.
    pub fn fill<C: Conn>(&mut self, conn: &mut C, rcv_nxt: u32, now: Instant) -> usize {
        let mut emitted = 0;
        while self.can_send() {
            let packet = match conn.read_input(MAX_PAYLOAD) {
                Input::Pending => break,
                Input::Data(payload) if payload.is_empty() => break,
                Input::Data(payload) => Packet::Data {
                    seqno: self.snd_nxt,
                    ackno: rcv_nxt,
                    payload,
                },
                Input::Eof => {
                    self.eof_sent = true;
                    Packet::Eof {
                        seqno: self.snd_nxt,
                        ackno: rcv_nxt,
                    }
                }
            };
            self.transmit(conn, packet, now);
            emitted += 1;
        }
        emitted
    }

    /// Iterate over in-flight packets from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &InFlight> {
        self.queue.iter()
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut InFlight> {
        self.queue.iter_mut()
    }

    /// Drop every queued packet.
    pub(crate) fn release(&mut self) {
        self.queue = VecDeque::new();
    }

    fn transmit<C: Conn>(&mut self, conn: &mut C, packet: Packet, now: Instant) {
        let wire = packet.encode();
        conn.transmit(&wire);
        log::debug!(
            "[rel] → {} seq={} len={} in_flight={}",
            if matches!(packet, Packet::Eof { .. }) { "EOF" } else { "DATA" },
            self.snd_nxt,
            wire.len(),
            self.in_flight() + 1
        );
        self.queue.push_back(InFlight {
            seqno: self.snd_nxt,
            wire,
            tx_count: 1,
            last_sent: now,
        });
        self.snd_nxt += 1;
    }
}
