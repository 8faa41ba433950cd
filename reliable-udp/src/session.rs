//! One connection's protocol state machine.
//!
//! A [`Session`] composes the [`SendWindow`], the [`ReassemblyBuffer`] and
//! the [`RetransmitTimer`] around an exclusively-owned [`Conn`].  It has three
//! entry points, each run to completion:
//!
//! - [`Session::on_receive`] — one raw datagram from the peer.
//! - [`Session::on_local_input_ready`] — the local source may have bytes.
//! - [`Session::on_timer_tick`] — periodic retransmission sweep.
//!
//! There is no explicit state enum.  A session is active until
//! `local EOF sent ∧ send window drained ∧ remote EOF delivered`; at that
//! point it releases its buffers, destroys its connection, and reports
//! [`Status::Terminated`] from then on.  Calls on a terminated session are
//! no-ops.

use std::time::Instant;

use crate::config::Config;
use crate::conn::Conn;
use crate::packet::Packet;
use crate::reassembly::{Arrival, ReassemblyBuffer};
use crate::send_window::SendWindow;
use crate::timer::RetransmitTimer;

/// Outcome of a session entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    /// The session finished and must be dropped by its owner.
    Terminated,
}

pub struct Session<C: Conn> {
    conn: C,
    sender: SendWindow,
    receiver: ReassemblyBuffer,
    timer: RetransmitTimer,
    terminated: bool,
}

impl<C: Conn> Session<C> {
    /// Create a session and emit whatever initial input is ready.
    pub fn open(conn: C, config: &Config, now: Instant) -> Self {
        let mut session = Self {
            conn,
            sender: SendWindow::new(config.window),
            receiver: ReassemblyBuffer::new(config.window),
            timer: RetransmitTimer::new(config.timeout),
            terminated: false,
        };
        log::info!(
            "[rel] session open: window={} timeout={:?}",
            config.window,
            config.timeout
        );
        session.refill(now);
        session
    }

    /// Handle one datagram from the peer.
    pub fn on_receive(&mut self, raw: &[u8], now: Instant) -> Status {
        if self.terminated {
            return Status::Terminated;
        }

        match Packet::decode(raw) {
            Err(e) => log::debug!("[rel] dropping datagram: {e}"),
            Ok(Packet::Ack { ackno }) => self.on_ack(ackno, now),
            Ok(Packet::Data { seqno, payload, .. }) => self.on_segment(seqno, payload),
            Ok(Packet::Eof { seqno, .. }) => self.on_segment(seqno, Vec::new()),
        }
        self.evaluate()
    }

    /// The local source signalled that input may be available.
    pub fn on_local_input_ready(&mut self, now: Instant) -> Status {
        if self.terminated {
            return Status::Terminated;
        }
        self.refill(now);
        self.evaluate()
    }

    /// Retransmit every in-flight packet whose timeout elapsed.
    pub fn on_timer_tick(&mut self, now: Instant) -> Status {
        if self.terminated {
            return Status::Terminated;
        }
        self.timer.sweep(&mut self.sender, &mut self.conn, now);
        self.evaluate()
    }

    /// `true` once the session has torn itself down.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Oldest unacknowledged seqno.
    pub fn snd_una(&self) -> u32 {
        self.sender.snd_una
    }

    /// Seqno the next new packet will carry.
    pub fn snd_nxt(&self) -> u32 {
        self.sender.snd_nxt
    }

    /// Next seqno expected in order from the peer.
    pub fn rcv_nxt(&self) -> u32 {
        self.receiver.rcv_nxt()
    }

    /// Packets sent but not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        self.sender.in_flight()
    }

    /// Number of out-of-order packets awaiting reassembly.
    pub fn buffered(&self) -> usize {
        self.receiver.buffered()
    }

    /// The session's collaborator.
    pub fn conn(&self) -> &C {
        &self.conn
    }

    /// Mutable access to the collaborator, e.g. to feed it input.
    pub fn conn_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    fn on_ack(&mut self, ackno: u32, now: Instant) {
        let purged = self.sender.on_ack(ackno);
        if purged > 0 {
            log::debug!(
                "[rel] ← ACK ack={} purged={} in_flight={}",
                ackno,
                purged,
                self.sender.in_flight()
            );
            self.refill(now);
        } else {
            log::trace!("[rel] ← ACK ack={} (no progress)", ackno);
        }
    }

    fn on_segment(&mut self, seqno: u32, payload: Vec<u8>) {
        match self.receiver.on_segment(seqno, payload) {
            Arrival::Complete => {
                log::trace!("[rel] ← seq={} after end of stream, ignored", seqno);
            }
            Arrival::OutOfWindow => {
                log::debug!(
                    "[rel] ← seq={} outside window (rcv_nxt={}), dropped",
                    seqno,
                    self.receiver.rcv_nxt()
                );
            }
            Arrival::Stale => {
                log::debug!("[rel] ← seq={} already delivered, re-ACK", seqno);
                self.send_ack();
            }
            Arrival::Accepted { advanced } => {
                if advanced {
                    self.receiver.deliver(&mut self.conn);
                }
                log::debug!(
                    "[rel] ← seq={} accepted; → ACK ack={}",
                    seqno,
                    self.receiver.rcv_nxt()
                );
                self.send_ack();
            }
        }
    }

    fn send_ack(&mut self) {
        let ack = Packet::Ack {
            ackno: self.receiver.rcv_nxt(),
        };
        self.conn.transmit(&ack.encode());
    }

    fn refill(&mut self, now: Instant) {
        self.sender
            .fill(&mut self.conn, self.receiver.rcv_nxt(), now);
    }

    /// Tear the session down the first time the termination condition holds.
    fn evaluate(&mut self) -> Status {
        if self.terminated {
            return Status::Terminated;
        }
        if self.sender.eof_sent() && self.sender.is_drained() && self.receiver.eof_delivered() {
            self.terminated = true;
            self.sender.release();
            self.receiver.release();
            self.conn.destroy();
            log::info!("[rel] session terminated");
            return Status::Terminated;
        }
        Status::Active
    }
}
