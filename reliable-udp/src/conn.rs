//! The per-session connection collaborator.
//!
//! A [`crate::session::Session`] never touches sockets or the console
//! directly.  Everything it needs from the outside world goes through a
//! [`Conn`]: pulling local input, handing reassembled bytes to the local sink,
//! putting encoded datagrams on the wire, and releasing channel resources when
//! the session ends.
//!
//! Every method must return immediately.  "Nothing ready" is a normal outcome
//! of [`Conn::read_input`], not an error.

/// Result of a non-blocking read from the local byte source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// No bytes are ready yet, but the source is still open.
    Pending,
    /// Between 1 and `max` bytes.
    Data(Vec<u8>),
    /// The source is exhausted.
    Eof,
}

/// Something delivered to the local byte sink, strictly in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Data(Vec<u8>),
    /// Emitted exactly once, after the last data chunk.
    Eof,
}

/// Connection collaborator owned exclusively by one session.
pub trait Conn {
    /// Pull up to `max` bytes of local input without blocking.
    fn read_input(&mut self, max: usize) -> Input;

    /// Deliver reassembled bytes (or end-of-stream) to the local sink.
    fn write_output(&mut self, output: Output);

    /// Best-effort transmission of one encoded datagram to the peer.
    fn transmit(&mut self, datagram: &[u8]);

    /// Release channel resources.  Called once, when the session terminates.
    fn destroy(&mut self);
}
