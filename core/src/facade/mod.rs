#![deny(unsafe_code)]
#![deny(warnings)]
//! Blocking socket facade
//!
//! [`SyncSocket`] gives a protocol client the blocking `connect`, `read`,
//! `write` and `disconnect` it expects, on top of a [`NetworkStack`] that
//! only ever reports progress through callbacks.
//!
//! Everything runs on one thread. `connect` and `read` are the only places
//! that wait, and they wait cooperatively: yield for a short, configurable
//! interval, drive one step of the stack's event processing, then look at
//! what the callbacks recorded. A timeout is only noticed at that
//! granularity.
//!
//! # Example
//!
//! ```ignore
//! let mut socket = SyncSocket::new(stack, clock, delay, FacadeConfig::default());
//! socket.connect("broker.example", 8883, &bundle)?;
//! socket.write(packet, Duration::from_secs(5))?;
//! match socket.read(&mut buf, Duration::from_millis(100))? {
//!     0 => {} // nothing yet
//!     n => handle(&buf[..n]),
//! }
//! ```

use core::net::{IpAddr, SocketAddr};
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use hal_abstractions::{MonotonicClock, NetworkStack, Resolution};

use crate::config::FacadeConfig;
use crate::connection::{ConnectionContext, ConnectionState, EventDispatch, ReceiveSlot};
use crate::credentials::CertificateBundle;
use crate::deadline::Deadline;
use crate::error::SocketError;


/// Blocking TLS socket over a callback-driven stack
///
/// Owns the stack, the connection context, the clock used for deadlines and
/// the delay used to yield. One connection, one read in flight at a time.
///
/// The TLS library behind `S` draws its randomness from a
/// [`HardwareEntropy`](crate::HardwareEntropy) the board builds before the
/// stack. `SyncSocket` never sees that adapter, so a missing noise source
/// must be caught by `HardwareEntropy::new` during board initialization,
/// before a socket exists:
///
/// ```ignore
/// let entropy = HardwareEntropy::new(rosc)?; // EntropyError::SourceUnavailable
/// let stack = BoardStack::new(netif, entropy);
/// let mut socket = SyncSocket::new(stack, clock, delay, FacadeConfig::default());
/// ```
pub struct SyncSocket<S: NetworkStack, C, D> {
    stack: S,
    clock: C,
    delay: D,
    config: FacadeConfig,
    context: ConnectionContext<S::Handle>,
}

impl<S, C, D> SyncSocket<S, C, D>
where
    S: NetworkStack,
    C: MonotonicClock,
    D: DelayNs,
{
    pub fn new(stack: S, clock: C, delay: D, config: FacadeConfig) -> Self {
        Self {
            stack,
            clock,
            delay,
            context: ConnectionContext::new(config.receive_policy),
            config,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.context.state()
    }

    pub fn context(&self) -> &ConnectionContext<S::Handle> {
        &self.context
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Resolve `hostname`, open a mutual-TLS session and wait for the
    /// handshake
    ///
    /// The whole sequence is bounded by `handshake_timeout`. A context left
    /// `Closed` or `Failed` by an earlier attempt is re-created first.
    ///
    /// # Errors
    ///
    /// - `AlreadyConnected` if a connection is live
    /// - `InvalidCredentials` if the bundle is not usable PEM (nothing is
    ///   started; the context stays `Idle`)
    /// - `DnsFailure`, `TransportError`, `HandshakeFailure`,
    ///   `HandshakeTimeout`, `PeerClosed` from the attempt itself
    pub fn connect(
        &mut self,
        hostname: &str,
        port: u16,
        bundle: &CertificateBundle<'_>,
    ) -> Result<(), SocketError> {
        match self.context.state() {
            ConnectionState::Idle => {}
            state if state.is_terminal() => {
                debug!("Re-creating connection context after {:?}", state);
                self.release();
                self.context = ConnectionContext::new(self.config.receive_policy);
            }
            _ => return Err(SocketError::AlreadyConnected),
        }

        bundle.validate().map_err(|e| {
            error!("Refusing to connect: {:?}", e);
            SocketError::InvalidCredentials(e)
        })?;

        info!("Connecting to {}:{}", hostname, port);
        let deadline = Deadline::arm(&self.clock, self.config.handshake_timeout);

        self.context.transition(ConnectionState::Resolving);
        match self.stack.resolve(hostname) {
            Ok(Resolution::Ready(address)) => {
                debug!("{} answered from DNS cache", hostname);
                self.context.set_resolved(address);
            }
            Ok(Resolution::Pending) => debug!("Resolving {}...", hostname),
            Err(e) => {
                error!("DNS setup failed: {}", e.code);
                return Err(self.fail(SocketError::DnsFailure));
            }
        }

        loop {
            if let Some(address) = self.context.take_resolved() {
                self.open_session(hostname, address, port, bundle)?;
            }

            match self.context.state() {
                ConnectionState::Established => {
                    info!("Connected to {}:{}", hostname, port);
                    return Ok(());
                }
                ConnectionState::Failed(reason) => {
                    self.release();
                    return Err(reason);
                }
                ConnectionState::Closed => {
                    self.release();
                    return Err(SocketError::PeerClosed);
                }
                _ => {}
            }

            self.yield_now(self.config.connect_poll_interval);

            if deadline.is_expired(&self.clock) {
                let reason = if self.context.state() == ConnectionState::Resolving {
                    SocketError::DnsFailure
                } else {
                    SocketError::HandshakeTimeout
                };
                error!(
                    "Connection to {} timed out in state {:?}",
                    hostname,
                    self.context.state()
                );
                return Err(self.fail(reason));
            }

            self.step(None);
        }
    }

    /// Wait up to `timeout` for received bytes
    ///
    /// Returns the number of bytes copied into `buffer`, or `Ok(0)` if the
    /// deadline passed with nothing received. Bytes of a chunk that do not
    /// fit `buffer` are queued or dropped per the receive policy.
    ///
    /// Bytes already queued in the backlog are returned first, even after the
    /// peer has closed or the transport has failed.
    ///
    /// # Errors
    ///
    /// Once the backlog is empty, fails without touching the stack unless the
    /// connection is `Established`: `PeerClosed` after the peer hung up, the
    /// failure reason after a failure, `NotConnected` otherwise.
    /// `PeerClosed` / `TransportError` if the connection goes away while
    /// waiting.
    pub fn read(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, SocketError> {
        let queued = self.context.drain_backlog(buffer);
        if queued > 0 {
            trace!("Read {} bytes from backlog", queued);
            return Ok(queued);
        }

        self.ensure_established()?;
        if buffer.is_empty() {
            return Ok(0);
        }

        let deadline = Deadline::arm(&self.clock, timeout);
        let mut slot = ReceiveSlot::new(buffer);

        loop {
            self.step(Some(&mut slot));

            if slot.filled() > 0 {
                return Ok(slot.filled());
            }
            match self.context.state() {
                ConnectionState::Established => {}
                ConnectionState::Closed => return Err(SocketError::PeerClosed),
                ConnectionState::Failed(reason) => return Err(reason),
                _ => return Err(SocketError::NotConnected),
            }
            if deadline.is_expired(&self.clock) {
                trace!("Read timed out after {} ms", timeout.as_millis() as u64);
                return Ok(0);
            }

            self.yield_now(self.config.io_poll_interval);
        }
    }

    /// Queue all of `buffer` on the stack and flush it
    ///
    /// Does not wait for the peer to acknowledge anything, so `_timeout` is
    /// accepted for interface compatibility only. There is no partial-write
    /// retry: the stack either takes the whole buffer or the write fails.
    ///
    /// # Errors
    ///
    /// `NotConnected`, `PeerClosed` or the failure reason unless `Established`;
    /// `WriteFailure` if the stack rejects the data, which also fails the
    /// connection.
    pub fn write(&mut self, buffer: &[u8], _timeout: Duration) -> Result<usize, SocketError> {
        self.ensure_established()?;
        if buffer.is_empty() {
            return Ok(0);
        }
        let Some(handle) = self.context.handle() else {
            return Err(SocketError::NotConnected);
        };

        let result = self
            .stack
            .write(handle, buffer)
            .and_then(|()| self.stack.flush(handle));

        match result {
            Ok(()) => Ok(buffer.len()),
            Err(e) => {
                error!("Writing {} bytes failed: {}", buffer.len(), e.code);
                Err(self.fail(SocketError::WriteFailure))
            }
        }
    }

    /// Close the connection. Safe to call in any state, any number of times.
    pub fn disconnect(&mut self) {
        self.release();
        self.context.clear_backlog();
        if !self.context.state().is_terminal() {
            self.context.transition(ConnectionState::Closed);
            info!("Disconnected");
        }
    }

    /// Run one step of the stack's event processing without a read armed
    ///
    /// Lets the owner keep the stack serviced between protocol operations.
    /// Data arriving now is queued or dropped per the receive policy.
    pub fn drive(&mut self) {
        self.step(None);
    }

    fn step(&mut self, slot: Option<&mut ReceiveSlot<'_>>) {
        let mut dispatch = EventDispatch::new(&mut self.context, slot);
        self.stack.poll(&mut dispatch);
        if self.context.state().is_terminal() {
            self.release();
        }
    }

    fn open_session(
        &mut self,
        hostname: &str,
        address: IpAddr,
        port: u16,
        bundle: &CertificateBundle<'_>,
    ) -> Result<(), SocketError> {
        let remote = SocketAddr::new(address, port);
        let tls = bundle.session_config(hostname);
        debug!("Opening TLS session, SNI {}", hostname);

        match self.stack.open(remote, &tls) {
            Ok(handle) => {
                self.context.attach_handle(handle);
                self.context.transition(ConnectionState::Handshaking);
                info!("Waiting for TLS handshake...");
                Ok(())
            }
            Err(e) => {
                error!("Failed to open transport: {}", e.code);
                Err(self.fail(SocketError::TransportError(e.code)))
            }
        }
    }

    fn ensure_established(&self) -> Result<(), SocketError> {
        match self.context.state() {
            ConnectionState::Established => Ok(()),
            ConnectionState::Failed(reason) => Err(reason),
            ConnectionState::Closed if self.context.closed_by_peer() => {
                Err(SocketError::PeerClosed)
            }
            _ => Err(SocketError::NotConnected),
        }
    }

    /// Fail the connection with `reason` and hand the reason back
    fn fail(&mut self, reason: SocketError) -> SocketError {
        self.context.transition(ConnectionState::Failed(reason));
        self.release();
        reason
    }

    fn release(&mut self) {
        if let Some(handle) = self.context.take_handle() {
            debug!("Closing transport handle");
            self.stack.close(handle);
        }
    }

    fn yield_now(&mut self, interval: Duration) {
        let micros = u32::try_from(interval.as_micros()).unwrap_or(u32::MAX);
        if micros > 0 {
            self.delay.delay_us(micros);
        }
    }
}

impl<S, C, D> embedded_io::ErrorType for SyncSocket<S, C, D>
where
    S: NetworkStack,
{
    type Error = SocketError;
}

/// Blocking read with the configured `io_timeout`
///
/// `Ok(0)` means end-of-stream to `embedded_io` users, so a timeout is
/// reported as `Err(SocketError::ReadTimeout)` here.
impl<S, C, D> embedded_io::Read for SyncSocket<S, C, D>
where
    S: NetworkStack,
    C: MonotonicClock,
    D: DelayNs,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let timeout = self.config.io_timeout;
        match SyncSocket::read(self, buf, timeout)? {
            0 if !buf.is_empty() => Err(SocketError::ReadTimeout),
            n => Ok(n),
        }
    }
}

impl<S, C, D> embedded_io::Write for SyncSocket<S, C, D>
where
    S: NetworkStack,
    C: MonotonicClock,
    D: DelayNs,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let timeout = self.config.io_timeout;
        SyncSocket::write(self, buf, timeout)
    }

    /// Every `write` already flushes
    fn flush(&mut self) -> Result<(), Self::Error> {
        self.ensure_established()
    }
}
