//! Retransmission timer.
//!
//! Reliable delivery requires that unacknowledged packets are re-sent if no
//! ACK arrives within a bounded time.  The host calls into every live session
//! on a fixed tick; on each tick [`RetransmitTimer::sweep`] resends every
//! in-flight packet whose last transmission is at least `timeout` old.
//!
//! The timeout is fixed: there is no RTT estimation and no back-off, because
//! the protocol has no congestion control.

use std::time::{Duration, Instant};

use crate::conn::Conn;
use crate::send_window::SendWindow;

/// Fixed-timeout retransmission policy shared by every in-flight packet.
#[derive(Debug, Clone, Copy)]
pub struct RetransmitTimer {
    timeout: Duration,
}

impl RetransmitTimer {
    /// A timer that resends after `timeout` without an ACK.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// `true` when a packet last sent at `last_sent` is due at `now`.
    pub fn is_expired(&self, last_sent: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last_sent) >= self.timeout
    }

    /// Resend every expired packet unmodified and refresh its timestamp.
    ///
    /// Returns the number of retransmissions.
    pub fn sweep<C: Conn>(&self, window: &mut SendWindow, conn: &mut C, now: Instant) -> usize {
        let mut resent = 0;
        for entry in window.entries_mut() {
            if self.is_expired(entry.last_sent, now) {
                conn.transmit(&entry.wire);
                entry.last_sent = now;
                entry.tx_count += 1;
                resent += 1;
                log::debug!(
                    "[rel] timeout: retransmit seq={} attempt={}",
                    entry.seqno,
                    entry.tx_count
                );
            }
        }
        resent
    }
}
