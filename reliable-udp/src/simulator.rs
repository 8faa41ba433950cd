//! In-memory network simulator for deterministic testing.
//!
//! Real networks drop, reorder, duplicate, and corrupt packets.  To exercise
//! the reliability mechanisms without depending on actual network conditions,
//! this module provides:
//!
//! - [`MemoryConn`] — a [`Conn`] with a scripted input queue that records
//!   every transmitted datagram and everything delivered to the sink.
//! - [`Link`] — two sessions joined by a pair of in-memory channels that
//!   apply a [`Faults`] model and deliver at most one packet per direction
//!   per step, under a virtual clock.
//!
//! | Fault       | Description                                         |
//! |-------------|-----------------------------------------------------|
//! | Loss        | Drop a datagram with probability `loss`.            |
//! | Duplication | Enqueue a datagram twice.                           |
//! | Reordering  | Insert a datagram at a random queue position.       |
//! | Corruption  | Flip one random bit.                                |
//!
//! Randomness comes from a seeded [`StdRng`] so failures are reproducible.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::conn::{Conn, Input, Output};
use crate::session::Session;

// ---------------------------------------------------------------------------
// MemoryConn
// ---------------------------------------------------------------------------

/// A scripted, recording connection.
///
/// Input items are consumed front to back.  An empty script reads as
/// [`Input::Pending`]; [`Input::Eof`] is sticky once reached.
#[derive(Debug, Default)]
pub struct MemoryConn {
    input: VecDeque<Input>,
    sent: Vec<Vec<u8>>,
    delivered: Vec<u8>,
    eof_count: usize,
    destroy_count: usize,
}

impl MemoryConn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `data` as chunks of `chunk` bytes followed by end-of-stream.
    pub fn with_stream(data: &[u8], chunk: usize) -> Self {
        let mut conn = Self::new();
        for piece in data.chunks(chunk.max(1)) {
            conn.push_input(Input::Data(piece.to_vec()));
        }
        conn.push_input(Input::Eof);
        conn
    }

    pub fn push_input(&mut self, input: Input) {
        self.input.push_back(input);
    }

    /// Drain the datagrams transmitted since the last call.
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }

    /// All bytes delivered to the sink so far.
    pub fn delivered(&self) -> &[u8] {
        &self.delivered
    }

    /// Number of end-of-stream signals delivered to the sink.
    pub fn eof_count(&self) -> usize {
        self.eof_count
    }

    pub fn destroy_count(&self) -> usize {
        self.destroy_count
    }
}

impl Conn for MemoryConn {
    fn read_input(&mut self, max: usize) -> Input {
        match self.input.pop_front() {
            None => Input::Pending,
            Some(Input::Eof) => {
                self.input.push_front(Input::Eof);
                Input::Eof
            }
            Some(Input::Data(mut bytes)) if bytes.len() > max => {
                let rest = bytes.split_off(max);
                self.input.push_front(Input::Data(rest));
                Input::Data(bytes)
            }
            Some(other) => other,
        }
    }

    fn write_output(&mut self, output: Output) {
        match output {
            Output::Data(bytes) => self.delivered.extend_from_slice(&bytes),
            Output::Eof => self.eof_count += 1,
        }
    }

    fn transmit(&mut self, datagram: &[u8]) {
        self.sent.push(datagram.to_vec());
    }

    fn destroy(&mut self) {
        self.destroy_count += 1;
    }
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// Fault-injection probabilities, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub loss: f64,
    pub duplicate: f64,
    pub reorder: f64,
    pub corrupt: f64,
}

impl Faults {
    /// A transparent channel.
    pub fn none() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// Two sessions connected through a faulty in-memory network.
pub struct Link {
    pub a: Session<MemoryConn>,
    pub b: Session<MemoryConn>,
    a_to_b: VecDeque<Vec<u8>>,
    b_to_a: VecDeque<Vec<u8>>,
    faults: Faults,
    rng: StdRng,
    /// Virtual clock.
    pub now: Instant,
    tick: Duration,
    /// Total datagrams that reached a session.
    pub delivered_packets: usize,
}

impl Link {
    /// Open both sessions at the same virtual instant.
    pub fn new(
        a: MemoryConn,
        b: MemoryConn,
        config: &Config,
        faults: Faults,
        seed: u64,
    ) -> Self {
        let now = Instant::now();
        Self {
            a: Session::open(a, config, now),
            b: Session::open(b, config, now),
            a_to_b: VecDeque::new(),
            b_to_a: VecDeque::new(),
            faults,
            rng: StdRng::seed_from_u64(seed),
            now,
            tick: config.timeout / 4,
            delivered_packets: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.a.is_terminated() && self.b.is_terminated()
    }

    /// Datagrams currently queued in either direction.
    pub fn queued(&self) -> usize {
        self.a_to_b.len() + self.b_to_a.len()
    }

    /// Advance the simulation by one step: move new transmissions onto the
    /// wire, deliver at most one datagram each way, poll local input, then
    /// advance the clock and fire the timers.
    pub fn step(&mut self) {
        for raw in self.a.conn_mut().take_sent() {
            enqueue(&mut self.a_to_b, raw, &self.faults, &mut self.rng);
        }
        for raw in self.b.conn_mut().take_sent() {
            enqueue(&mut self.b_to_a, raw, &self.faults, &mut self.rng);
        }

        if let Some(raw) = self.a_to_b.pop_front() {
            self.b.on_receive(&raw, self.now);
            self.delivered_packets += 1;
        }
        if let Some(raw) = self.b_to_a.pop_front() {
            self.a.on_receive(&raw, self.now);
            self.delivered_packets += 1;
        }

        self.a.on_local_input_ready(self.now);
        self.b.on_local_input_ready(self.now);

        self.now += self.tick;
        self.a.on_timer_tick(self.now);
        self.b.on_timer_tick(self.now);
    }

    /// Step until both sessions terminate.  Returns `false` if `max_steps`
    /// ran out first.
    pub fn run(&mut self, max_steps: usize) -> bool {
        for _ in 0..max_steps {
            if self.is_done() {
                return true;
            }
            self.step();
        }
        self.is_done()
    }
}

fn enqueue(queue: &mut VecDeque<Vec<u8>>, mut raw: Vec<u8>, faults: &Faults, rng: &mut StdRng) {
    if rng.random_bool(faults.loss) {
        return;
    }
    if !raw.is_empty() && rng.random_bool(faults.corrupt) {
        let bit = rng.random_range(0..raw.len() * 8);
        raw[bit / 8] ^= 1 << (bit % 8);
    }
    let copies = if rng.random_bool(faults.duplicate) { 2 } else { 1 };
    for _ in 0..copies {
        if !queue.is_empty() && rng.random_bool(faults.reorder) {
            let at = rng.random_range(0..queue.len());
            queue.insert(at, raw.clone());
        } else {
            queue.push_back(raw.clone());
        }
    }
}
