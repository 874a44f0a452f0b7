#![deny(unsafe_code)]
#![deny(warnings)]
//! Shared per-connection record
//!
//! Owned by the facade and lent to the event dispatcher for one `poll` at a
//! time. Holds the stack handle, the lifecycle state, the address produced by
//! a lookup, and the optional receive backlog.

use core::net::IpAddr;

use heapless::Deque;

use crate::config::{ReceivePolicy, BACKLOG_CAPACITY};

use super::state::ConnectionState;

pub struct ConnectionContext<H> {
    state: ConnectionState,
    handle: Option<H>,
    resolved: Option<IpAddr>,
    policy: ReceivePolicy,
    backlog: Deque<u8, BACKLOG_CAPACITY>,
    dropped_bytes: usize,
    closed_by_peer: bool,
}

impl<H> ConnectionContext<H> {
    pub fn new(policy: ReceivePolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            handle: None,
            resolved: None,
            policy,
            backlog: Deque::new(),
            dropped_bytes: 0,
            closed_by_peer: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Apply a state transition, ignoring (and logging) invalid ones
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        let applied = self.state.transition(next);
        if applied {
            debug!("Connection state -> {:?}", next);
        } else {
            debug!("Ignoring transition {:?} -> {:?}", self.state, next);
        }
        applied
    }

    /// `Closed` because the peer hung up, not because of `disconnect`
    pub fn closed_by_peer(&self) -> bool {
        self.closed_by_peer && self.state == ConnectionState::Closed
    }

    /// Record a peer close; only moves an established connection to `Closed`
    pub(crate) fn close_from_peer(&mut self) -> bool {
        if self.state != ConnectionState::Established {
            return false;
        }
        self.closed_by_peer = self.transition(ConnectionState::Closed);
        self.closed_by_peer
    }

    pub fn policy(&self) -> ReceivePolicy {
        self.policy
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn attach_handle(&mut self, handle: H) {
        self.handle = Some(handle);
    }

    pub(crate) fn take_handle(&mut self) -> Option<H> {
        self.handle.take()
    }

    pub(crate) fn set_resolved(&mut self, address: IpAddr) {
        self.resolved = Some(address);
    }

    /// Address waiting to be connected to, only while still resolving
    pub(crate) fn take_resolved(&mut self) -> Option<IpAddr> {
        if self.state == ConnectionState::Resolving {
            self.resolved.take()
        } else {
            None
        }
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Total received bytes that were never delivered to a reader
    pub fn dropped_bytes(&self) -> usize {
        self.dropped_bytes
    }

    /// Keep bytes no armed read could take, as far as the policy allows
    pub(crate) fn stash(&mut self, bytes: &[u8]) {
        let mut kept = 0;
        if self.policy == ReceivePolicy::Backlog {
            for &byte in bytes {
                if self.backlog.push_back(byte).is_err() {
                    break;
                }
                kept += 1;
            }
        }
        let dropped = bytes.len() - kept;
        if dropped > 0 {
            self.dropped_bytes += dropped;
            warn!(
                "Dropped {} received bytes ({} queued, {} dropped total)",
                dropped,
                kept,
                self.dropped_bytes
            );
        }
    }

    /// Move queued bytes into `buffer`, oldest first
    pub(crate) fn drain_backlog(&mut self, buffer: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buffer.iter_mut() {
            match self.backlog.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    pub(crate) fn clear_backlog(&mut self) {
        self.backlog.clear();
    }
}

/// Receive hand-off slot
///
/// Borrows the caller's buffer for exactly one blocking read, so the stack
/// callbacks can never hold on to it after that read returns. Filled at most
/// once per read.
pub struct ReceiveSlot<'b> {
    destination: &'b mut [u8],
    filled: usize,
}

impl<'b> ReceiveSlot<'b> {
    pub fn new(destination: &'b mut [u8]) -> Self {
        Self {
            destination,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.destination.len()
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_open(&self) -> bool {
        self.filled == 0 && !self.destination.is_empty()
    }

    /// Copy as much of `chunk` as fits; returns the number of bytes taken
    pub(crate) fn fill(&mut self, chunk: &[u8]) -> usize {
        if !self.is_open() {
            return 0;
        }
        let count = chunk.len().min(self.destination.len());
        self.destination[..count].copy_from_slice(&chunk[..count]);
        self.filled = count;
        count
    }
}
