//! `reliable-udp` — a reliable, in-order, duplex byte stream over an
//! unreliable datagram channel.
//!
//! # Architecture
//!
//! ```text
//!             raw datagram
//!                 │
//!  ┌──────────────▼───────────────────────────────┐
//!  │ Session  (on_receive / on_local_input_ready / │
//!  │           on_timer_tick, termination check)   │
//!  │   ├── packet       decode + checksum          │
//!  │   ├── SendWindow   ACK → purge → refill        │
//!  │   ├── Reassembly   data/EOF → rcv_nxt → sink   │
//!  │   └── Timer        fixed-timeout resend        │
//!  └──────────────┬───────────────────────────────┘
//!                 │ Conn (read input, write output, transmit, destroy)
//!  ┌──────────────▼──────┐
//!  │ host::UdpConn       │  or simulator::MemoryConn in tests
//!  └─────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]      — wire format (serialise / deserialise, checksum)
//! - [`conn`]        — connection collaborator trait
//! - [`config`]      — window and timeout parameters
//! - [`send_window`] — outbound sliding window
//! - [`reassembly`]  — inbound reordering and cumulative ACK cursor
//! - [`timer`]       — retransmission sweep
//! - [`session`]     — per-connection state machine
//! - [`registry`]    — the set of live sessions
//! - [`socket`]      — async UDP socket abstraction
//! - [`host`]        — UDP event loop driving a session
//! - [`simulator`]   — lossy/reordering in-memory network for testing

pub mod config;
pub mod conn;
pub mod host;
pub mod packet;
pub mod reassembly;
pub mod registry;
pub mod send_window;
pub mod session;
pub mod simulator;
pub mod socket;
pub mod timer;
