//! UDP host: drives one session between a local byte stream and a peer.
//!
//! # Architecture
//!
//! ```text
//!  local input chunks ──▶ ┌──────────────────────────────┐ ──▶ datagrams
//!   (mpsc::Receiver)      │ run(): select! loop          │     (Socket)
//!                         │   Registry ─ Session<UdpConn>│
//!  local output      ◀──  └──────────────────────────────┘ ◀── datagrams
//!   (mpsc::UnboundedSender<Output>)        ▲
//!                                          └── interval tick
//! ```
//!
//! The loop is single-threaded and run-to-completion: each inbound datagram,
//! input chunk, or tick is handled fully before the next `select!`.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::conn::{Conn, Input, Output};
use crate::registry::Registry;
use crate::session::Session;
use crate::socket::{Socket, SocketError, RECV_BUF_LEN};

/// Stop pulling local input once this many bytes are waiting to be sent.
const INPUT_HIGH_WATER: usize = 64 * 1024;

/// Parameters for [`run`].
#[derive(Debug, Clone, Copy)]
pub struct HostConfig {
    /// The only address datagrams are accepted from and sent to.
    pub peer: SocketAddr,
    pub session: Config,
    /// Retransmission sweep interval.
    pub tick: Duration,
}

// ---------------------------------------------------------------------------
// UdpConn
// ---------------------------------------------------------------------------

/// [`Conn`] backed by a shared UDP socket and channel-fed local streams.
pub struct UdpConn {
    socket: Arc<Socket>,
    peer: SocketAddr,
    /// Local input not yet packetised.
    pending: VecDeque<u8>,
    input_closed: bool,
    output: mpsc::UnboundedSender<Output>,
    destroyed: bool,
}

impl UdpConn {
    pub fn new(
        socket: Arc<Socket>,
        peer: SocketAddr,
        output: mpsc::UnboundedSender<Output>,
    ) -> Self {
        Self {
            socket,
            peer,
            pending: VecDeque::new(),
            input_closed: false,
            output,
            destroyed: false,
        }
    }

    /// Append a chunk read from the local source.
    pub fn push_input(&mut self, chunk: Vec<u8>) {
        self.pending.extend(chunk);
    }

    /// The local source reached end-of-stream.
    pub fn close_input(&mut self) {
        self.input_closed = true;
    }

    /// `true` while the host should keep reading the local source.
    pub fn wants_input(&self) -> bool {
        !self.input_closed && self.pending.len() < INPUT_HIGH_WATER
    }
}

impl Conn for UdpConn {
    fn read_input(&mut self, max: usize) -> Input {
        if self.pending.is_empty() {
            return if self.input_closed {
                Input::Eof
            } else {
                Input::Pending
            };
        }
        let n = max.min(self.pending.len());
        Input::Data(self.pending.drain(..n).collect())
    }

    fn write_output(&mut self, output: Output) {
        if self.output.send(output).is_err() {
            log::warn!("[host] local sink closed; output discarded");
        }
    }

    fn transmit(&mut self, datagram: &[u8]) {
        if self.destroyed {
            return;
        }
        match self.socket.try_send_to(datagram, self.peer) {
            Ok(true) => {}
            Ok(false) => log::trace!("[host] socket busy; {} bytes dropped", datagram.len()),
            Err(e) => log::warn!("[host] send to {} failed: {e}", self.peer),
        }
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.pending = VecDeque::new();
        log::info!("[host] connection to {} released", self.peer);
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run one session to completion.
///
/// Local input arrives as chunks on `input`; closing the channel signals
/// end-of-stream.  Reassembled bytes, then a single [`Output::Eof`], are
/// sent on `output`.  Returns once the session has terminated, or on a
/// socket receive error.
pub async fn run(
    socket: Socket,
    config: HostConfig,
    mut input: mpsc::Receiver<Vec<u8>>,
    output: mpsc::UnboundedSender<Output>,
) -> Result<(), SocketError> {
    let socket = Arc::new(socket);
    log::info!(
        "[host] {} ⇄ {} window={} timeout={:?} tick={:?}",
        socket.local_addr,
        config.peer,
        config.session.window,
        config.session.timeout,
        config.tick
    );

    let conn = UdpConn::new(Arc::clone(&socket), config.peer, output);
    let mut registry = Registry::new();
    let id = registry.insert(Session::open(conn, &config.session, Instant::now()));

    let mut ticker = tokio::time::interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut buf = vec![0u8; RECV_BUF_LEN];

    while registry.contains(id) {
        let wants_input = registry
            .get(id)
            .is_some_and(|session| session.conn().wants_input());

        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                let (n, addr) = result?;
                if addr != config.peer {
                    log::debug!("[host] ignoring {n} bytes from stranger {addr}");
                    continue;
                }
                registry.on_receive(id, &buf[..n], Instant::now());
            }

            chunk = input.recv(), if wants_input => {
                if let Some(session) = registry.get_mut(id) {
                    match chunk {
                        Some(bytes) => session.conn_mut().push_input(bytes),
                        None => session.conn_mut().close_input(),
                    }
                }
                registry.on_local_input_ready(id, Instant::now());
            }

            _ = ticker.tick() => {
                registry.tick(Instant::now());
            }
        }
    }

    log::info!("[host] session with {} finished", config.peer);
    Ok(())
}
