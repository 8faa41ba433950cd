//! The set of live sessions.
//!
//! Owned by whatever drives the periodic sweep (see [`crate::host`]); there is
//! no process-wide list.  Sessions live in a [`Slab`], so insertion and
//! removal are O(1) and a [`SessionId`] stays valid until its session
//! terminates.  Every dispatch method removes the session the moment it
//! reports [`Status::Terminated`], which drops its buffers and connection
//! together.

use std::time::Instant;

use slab::Slab;

use crate::conn::Conn;
use crate::session::{Session, Status};

/// Stable handle to a session inside a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(usize);

/// Owner of every live [`Session`], keyed by [`SessionId`].
pub struct Registry<C: Conn> {
    sessions: Slab<Session<C>>,
}

impl<C: Conn> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Conn> Registry<C> {
    pub fn new() -> Self {
        Self {
            sessions: Slab::new(),
        }
    }

    /// Add a freshly opened session.
    pub fn insert(&mut self, session: Session<C>) -> SessionId {
        SessionId(self.sessions.insert(session))
    }

    pub fn get(&self, id: SessionId) -> Option<&Session<C>> {
        self.sessions.get(id.0)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session<C>> {
        self.sessions.get_mut(id.0)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Route a datagram to its session.  `None` if `id` is not live.
    pub fn on_receive(&mut self, id: SessionId, raw: &[u8], now: Instant) -> Option<Status> {
        let status = self.sessions.get_mut(id.0)?.on_receive(raw, now);
        Some(self.reap(id, status))
    }

    /// Signal local input readiness to a session.  `None` if `id` is not live.
    pub fn on_local_input_ready(&mut self, id: SessionId, now: Instant) -> Option<Status> {
        let status = self.sessions.get_mut(id.0)?.on_local_input_ready(now);
        Some(self.reap(id, status))
    }

    /// Run the retransmission sweep over every live session.
    ///
    /// Returns the number of sessions that terminated during the sweep.
    pub fn tick(&mut self, now: Instant) -> usize {
        // Snapshot the keys: a session may remove itself mid-sweep.
        let keys: Vec<usize> = self.sessions.iter().map(|(key, _)| key).collect();
        let mut finished = 0;
        for key in keys {
            let Some(session) = self.sessions.get_mut(key) else {
                continue;
            };
            let status = session.on_timer_tick(now);
            if self.reap(SessionId(key), status) == Status::Terminated {
                finished += 1;
            }
        }
        finished
    }

    fn reap(&mut self, id: SessionId, status: Status) -> Status {
        if status == Status::Terminated {
            self.sessions.remove(id.0);
            log::debug!("[rel] session {:?} removed, {} live", id, self.sessions.len());
        }
        status
    }
}
