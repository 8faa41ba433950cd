//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that moves raw
//! datagrams.  Decoding happens inside the session, so a corrupt datagram is
//! just bytes here.  All protocol logic lives elsewhere; this module owns only
//! byte I/O.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::packet::MAX_PACKET_LEN;

/// Receive buffer size.  Anything longer than a valid packet is truncated by
/// the OS and then rejected by the decoder.
pub const RECV_BUF_LEN: usize = MAX_PACKET_LEN + 1;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An async, datagram-oriented UDP socket.
///
/// All methods are `&self` so the socket can be shared between the host loop
/// and the session's connection.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `127.0.0.1:0` lets the OS choose an ephemeral port.  Returns
    /// once the reactor reports the socket writable, so the first
    /// [`Socket::try_send_to`] is not refused with `WouldBlock`.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        inner.writable().await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Send one datagram without waiting for socket readiness.
    ///
    /// Returns `Ok(false)` when the socket buffer is full and the datagram was
    /// dropped; the retransmission timer recovers from that like any loss.
    pub fn try_send_to(&self, datagram: &[u8], dest: SocketAddr) -> Result<bool, SocketError> {
        match self.inner.try_send_to(datagram, dest) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Receive the next datagram into `buf`.
    ///
    /// Returns `(length, sender_address)`.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError> {
        Ok(self.inner.recv_from(buf).await?)
    }
}
