//! Receive-side reassembly.
//!
//! [`ReassemblyBuffer`] holds data and EOF packets that arrived inside the
//! receive window, computes the cumulative cursor `rcv_nxt`, and hands the
//! contiguous prefix to the local sink.
//!
//! - Packets below `rcv_nxt` were already delivered ([`Arrival::Stale`]).
//! - Packets at or beyond `rcv_nxt + capacity` are outside the window
//!   ([`Arrival::OutOfWindow`]).
//! - Anything else is buffered once; re-inserting a buffered seqno is a
//!   no-op.
//!
//! After every accepted arrival the caller should send a **cumulative ACK**
//! carrying [`ReassemblyBuffer::rcv_nxt`].  This module does no I/O besides
//! writing to the sink through [`Conn::write_output`].

use std::collections::BTreeMap;

use crate::conn::{Conn, Output};

/// Classification of an inbound data or EOF packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// The remote end-of-stream was already delivered; nothing left to do.
    Complete,
    /// Already delivered; the peer missed our ACK.
    Stale,
    /// Beyond the receive window; the peer violated flow control.
    OutOfWindow,
    /// Inside the window.  `advanced` is set when `rcv_nxt` moved forward.
    Accepted { advanced: bool },
}

/// Receive-side state for one session.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    /// Smallest sequence number not yet reassembled.
    rcv_nxt: u32,

    capacity: usize,

    /// Out-of-order and not-yet-delivered packets.  An empty payload is the
    /// EOF marker.
    pending: BTreeMap<u32, Vec<u8>>,

    eof_delivered: bool,
}

impl ReassemblyBuffer {
    /// Create an empty buffer expecting seqno 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            rcv_nxt: 1,
            capacity,
            pending: BTreeMap::new(),
            eof_delivered: false,
        }
    }

    /// Cumulative ACK number for outbound packets.
    pub fn rcv_nxt(&self) -> u32 {
        self.rcv_nxt
    }

    /// `true` once end-of-stream reached the sink.
    pub fn eof_delivered(&self) -> bool {
        self.eof_delivered
    }

    /// Number of buffered, undelivered packets.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Admit an inbound data (`payload` non-empty) or EOF (`payload` empty)
    /// packet.
    pub fn on_segment(&mut self, seqno: u32, payload: Vec<u8>) -> Arrival {
        if self.eof_delivered {
            return Arrival::Complete;
        }
        if seqno < self.rcv_nxt {
            return Arrival::Stale;
        }
        if u64::from(seqno) >= u64::from(self.rcv_nxt) + self.capacity as u64 {
            return Arrival::OutOfWindow;
        }

        self.pending.entry(seqno).or_insert(payload);

        let advanced = seqno == self.rcv_nxt;
        if advanced {
            self.advance();
        }
        Arrival::Accepted { advanced }
    }

    /// Move `rcv_nxt` across every contiguous buffered seqno, stopping after
    /// the EOF marker.
    fn advance(&mut self) {
        // Bounded by the sender's `u32` seqno space; see `send_window`.
        while let Some(payload) = self.pending.get(&self.rcv_nxt) {
            let eof = payload.is_empty();
            self.rcv_nxt += 1;
            if eof {
                break;
            }
        }
    }

    /// Hand every packet below `rcv_nxt` to the sink, in order.
    ///
    /// Returns the number of payload bytes delivered.  Reaching the EOF marker
    /// signals end-of-stream and releases whatever is still buffered.
    pub fn deliver<C: Conn>(&mut self, conn: &mut C) -> usize {
        let mut bytes = 0;
        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() >= self.rcv_nxt {
                break;
            }
            let payload = entry.remove();
            if payload.is_empty() {
                self.eof_delivered = true;
                conn.write_output(Output::Eof);
                self.release();
                log::debug!("[rel] ← end of stream delivered");
                break;
            }
            bytes += payload.len();
            conn.write_output(Output::Data(payload));
        }
        bytes
    }

    /// Drop every buffered packet.
    pub(crate) fn release(&mut self) {
        self.pending = BTreeMap::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::MemoryConn;

    #[test]
    fn initial_state() {
        let r = ReassemblyBuffer::new(4);
        assert_eq!(r.rcv_nxt(), 1);
        assert_eq!(r.buffered(), 0);
        assert!(!r.eof_delivered());
    }

    #[test]
    fn in_order_segment_delivered() {
        let mut r = ReassemblyBuffer::new(1);
        let mut conn = MemoryConn::new();
        assert_eq!(
            r.on_segment(1, b"hello".to_vec()),
            Arrival::Accepted { advanced: true }
        );
        assert_eq!(r.rcv_nxt(), 2);
        assert_eq!(r.deliver(&mut conn), 5);
        assert_eq!(conn.delivered(), b"hello");
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn gap_holds_back_delivery() {
        let mut r = ReassemblyBuffer::new(4);
        let mut conn = MemoryConn::new();

        assert_eq!(
            r.on_segment(3, b"ccc".to_vec()),
            Arrival::Accepted { advanced: false }
        );
        assert_eq!(r.rcv_nxt(), 1);
        assert_eq!(r.deliver(&mut conn), 0);

        r.on_segment(1, b"a".to_vec());
        assert_eq!(r.rcv_nxt(), 2);
        r.deliver(&mut conn);
        assert_eq!(conn.delivered(), b"a");

        r.on_segment(2, b"bb".to_vec());
        assert_eq!(r.rcv_nxt(), 4);
        r.deliver(&mut conn);
        assert_eq!(conn.delivered(), b"abbccc");
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn stale_segment_is_not_rebuffered() {
        let mut r = ReassemblyBuffer::new(2);
        let mut conn = MemoryConn::new();
        r.on_segment(1, b"x".to_vec());
        r.deliver(&mut conn);

        assert_eq!(r.on_segment(1, b"x".to_vec()), Arrival::Stale);
        assert_eq!(r.buffered(), 0);
        assert_eq!(r.rcv_nxt(), 2);
    }

    #[test]
    fn out_of_window_segment_dropped() {
        let mut r = ReassemblyBuffer::new(2);
        assert_eq!(r.on_segment(3, b"far".to_vec()), Arrival::OutOfWindow);
        assert_eq!(
            r.on_segment(2, b"near".to_vec()),
            Arrival::Accepted { advanced: false }
        );
        assert_eq!(r.buffered(), 1);
    }

    #[test]
    fn duplicate_insert_keeps_first_copy() {
        let mut r = ReassemblyBuffer::new(4);
        let mut conn = MemoryConn::new();
        r.on_segment(2, b"first".to_vec());
        r.on_segment(2, b"first".to_vec());
        assert_eq!(r.buffered(), 1);

        r.on_segment(1, b"0".to_vec());
        r.deliver(&mut conn);
        assert_eq!(conn.delivered(), b"0first");
    }

    #[test]
    fn eof_terminates_stream() {
        let mut r = ReassemblyBuffer::new(4);
        let mut conn = MemoryConn::new();
        r.on_segment(2, Vec::new());
        r.on_segment(1, b"tail".to_vec());
        assert_eq!(r.rcv_nxt(), 3);

        r.deliver(&mut conn);
        assert!(r.eof_delivered());
        assert_eq!(conn.delivered(), b"tail");
        assert_eq!(conn.eof_count(), 1);
        assert_eq!(r.on_segment(3, b"late".to_vec()), Arrival::Complete);
    }

    #[test]
    fn cursor_stops_after_eof_marker() {
        let mut r = ReassemblyBuffer::new(4);
        r.on_segment(2, b"bogus".to_vec());
        r.on_segment(1, Vec::new());
        assert_eq!(r.rcv_nxt(), 2);
    }
}
