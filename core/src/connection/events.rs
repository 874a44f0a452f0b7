#![deny(unsafe_code)]
#![deny(warnings)]
//! Stack event dispatch
//!
//! [`EventDispatch`] is the callback set handed to
//! [`NetworkStack::poll`](hal_abstractions::NetworkStack::poll). It borrows
//! the connection context (and, during a read, the armed receive slot) for
//! that one poll, records what happened, and returns. It never blocks and
//! never calls back into the stack.
//!
//! Notifications that no longer fit the current state are dropped. In
//! particular a handshake completion that arrives after the facade has
//! already given up with `HandshakeTimeout` leaves the context `Failed`.

use core::net::IpAddr;

use hal_abstractions::{EventHandler, StackError};

use crate::error::SocketError;

use super::context::{ConnectionContext, ReceiveSlot};
use super::state::ConnectionState;

pub struct EventDispatch<'c, 'b, H> {
    context: &'c mut ConnectionContext<H>,
    slot: Option<&'c mut ReceiveSlot<'b>>,
}

impl<'c, 'b, H> EventDispatch<'c, 'b, H> {
    pub fn new(context: &'c mut ConnectionContext<H>, slot: Option<&'c mut ReceiveSlot<'b>>) -> Self {
        Self { context, slot }
    }
}

impl<H> EventHandler for EventDispatch<'_, '_, H> {
    fn on_resolved(&mut self, hostname: &str, address: Option<IpAddr>) {
        if self.context.state() != ConnectionState::Resolving {
            warn!("Ignoring late DNS answer for {}", hostname);
            return;
        }
        match address {
            Some(address) => {
                info!("DNS resolved {}", hostname);
                self.context.set_resolved(address);
            }
            None => {
                error!("DNS resolution failed for {}", hostname);
                self.context
                    .transition(ConnectionState::Failed(SocketError::DnsFailure));
            }
        }
    }

    fn on_connected(&mut self, result: Result<(), StackError>) {
        if self.context.state() != ConnectionState::Handshaking {
            warn!(
                "Ignoring handshake notification in state {:?}",
                self.context.state()
            );
            return;
        }
        match result {
            Ok(()) => {
                info!("TLS connected");
                self.context.transition(ConnectionState::Established);
            }
            Err(e) => {
                error!("TLS connect failed: {}", e.code);
                self.context.transition(ConnectionState::Failed(
                    SocketError::HandshakeFailure(e.code),
                ));
            }
        }
    }

    fn on_data_received(&mut self, chunk: &[u8]) -> usize {
        let state = self.context.state();

        if chunk.is_empty() {
            match state {
                ConnectionState::Established => {
                    info!(
                        "Connection closed by peer ({} bytes still queued)",
                        self.context.backlog_len()
                    );
                    self.context.close_from_peer();
                }
                ConnectionState::Resolving | ConnectionState::Handshaking => {
                    error!("Peer closed the connection during setup");
                    self.context
                        .transition(ConnectionState::Failed(SocketError::PeerClosed));
                }
                _ => {}
            }
            return 0;
        }

        if !state.is_established() {
            warn!("Discarding {} bytes received in state {:?}", chunk.len(), state);
            return chunk.len();
        }

        // The backlog holds older bytes; never let a new chunk overtake them.
        let taken = match self.slot.as_deref_mut() {
            Some(slot) if self.context.backlog_len() == 0 => slot.fill(chunk),
            _ => 0,
        };
        if taken > 0 {
            trace!("Handed {} of {} bytes to reader", taken, chunk.len());
        }
        self.context.stash(&chunk[taken..]);

        // The whole chunk is off the stack's hands, so the whole chunk is
        // acknowledged. Acking less would shrink the receive window for good.
        chunk.len()
    }

    fn on_error(&mut self, error: StackError) {
        error!("Transport error: {}", error.code);
        // The stack has already freed the connection.
        self.context.take_handle();
        self.context
            .transition(ConnectionState::Failed(SocketError::TransportError(error.code)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReceivePolicy;

    fn context_in(state: ConnectionState) -> ConnectionContext<u8> {
        context_with(ReceivePolicy::Discard, state)
    }

    fn context_with(policy: ReceivePolicy, state: ConnectionState) -> ConnectionContext<u8> {
        let mut ctx = ConnectionContext::new(policy);
        let path = [
            ConnectionState::Resolving,
            ConnectionState::Handshaking,
            ConnectionState::Established,
        ];
        for step in path {
            if ctx.state() == state {
                break;
            }
            ctx.transition(step);
        }
        ctx.attach_handle(1);
        ctx
    }

    #[test]
    fn test_resolution_failure_fails_context() {
        let mut ctx = context_in(ConnectionState::Resolving);
        EventDispatch::new(&mut ctx, None).on_resolved("broker.example", None);
        assert_eq!(ctx.state(), ConnectionState::Failed(SocketError::DnsFailure));
    }

    #[test]
    fn test_handshake_success_and_failure() {
        let mut ctx = context_in(ConnectionState::Handshaking);
        EventDispatch::new(&mut ctx, None).on_connected(Ok(()));
        assert_eq!(ctx.state(), ConnectionState::Established);

        let mut ctx = context_in(ConnectionState::Handshaking);
        EventDispatch::new(&mut ctx, None).on_connected(Err(StackError::new(-26)));
        assert_eq!(
            ctx.state(),
            ConnectionState::Failed(SocketError::HandshakeFailure(-26))
        );
    }

    #[test]
    fn test_late_handshake_success_ignored() {
        let mut ctx = context_in(ConnectionState::Handshaking);
        ctx.transition(ConnectionState::Failed(SocketError::HandshakeTimeout));
        EventDispatch::new(&mut ctx, None).on_connected(Ok(()));
        assert_eq!(
            ctx.state(),
            ConnectionState::Failed(SocketError::HandshakeTimeout)
        );
    }

    #[test]
    fn test_data_fills_armed_slot_and_acks_whole_chunk() {
        let mut ctx = context_in(ConnectionState::Established);
        let mut buf = [0u8; 3];
        let mut slot = ReceiveSlot::new(&mut buf);
        let acked = EventDispatch::new(&mut ctx, Some(&mut slot)).on_data_received(b"hello");
        assert_eq!(acked, 5);
        assert_eq!(slot.filled(), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(ctx.dropped_bytes(), 2);
    }

    #[test]
    fn test_data_without_armed_slot_is_discarded() {
        let mut ctx = context_in(ConnectionState::Established);
        let acked = EventDispatch::new(&mut ctx, None).on_data_received(b"abc");
        assert_eq!(acked, 3);
        assert_eq!(ctx.dropped_bytes(), 3);
    }

    #[test]
    fn test_empty_chunk_means_peer_closed() {
        let mut ctx = context_in(ConnectionState::Established);
        assert_eq!(EventDispatch::new(&mut ctx, None).on_data_received(&[]), 0);
        assert_eq!(ctx.state(), ConnectionState::Closed);
        assert!(ctx.closed_by_peer());
    }

    #[test]
    fn test_empty_chunk_during_handshake_fails_setup() {
        let mut ctx = context_in(ConnectionState::Handshaking);
        assert_eq!(EventDispatch::new(&mut ctx, None).on_data_received(&[]), 0);
        assert_eq!(ctx.state(), ConnectionState::Failed(SocketError::PeerClosed));
        assert!(!ctx.closed_by_peer());
    }

    #[test]
    fn test_backlog_survives_peer_close() {
        let mut ctx = context_with(ReceivePolicy::Backlog, ConnectionState::Established);
        let mut dispatch = EventDispatch::new(&mut ctx, None);
        assert_eq!(dispatch.on_data_received(b"tail"), 4);
        dispatch.on_data_received(&[]);
        assert_eq!(ctx.state(), ConnectionState::Closed);
        assert_eq!(ctx.backlog_len(), 4);
    }

    #[test]
    fn test_error_releases_handle_and_fails() {
        let mut ctx = context_in(ConnectionState::Established);
        EventDispatch::new(&mut ctx, None).on_error(StackError::new(-14));
        assert!(!ctx.has_handle());
        assert_eq!(
            ctx.state(),
            ConnectionState::Failed(SocketError::TransportError(-14))
        );
    }
}
