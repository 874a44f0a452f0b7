#![deny(unsafe_code)]
#![deny(warnings)]
//! Callback-driven network/TLS stack capability
//!
//! Models stacks in the lwIP `altcp` mould: every operation returns
//! immediately and outcomes are reported later through an [`EventHandler`]
//! while the owner drives the stack with [`NetworkStack::poll`]. Everything
//! runs on one thread; the handler is only ever borrowed for the duration of
//! a single `poll` call.

use core::net::{IpAddr, SocketAddr};

/// Raw error code reported by the stack (lwIP `err_t` style, negative values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackError {
    pub code: i32,
}

impl StackError {
    pub const fn new(code: i32) -> Self {
        Self { code }
    }
}

impl core::fmt::Display for StackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "stack error {}", self.code)
    }
}

impl core::error::Error for StackError {}

/// Outcome of starting a hostname lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Answered synchronously (e.g. from the DNS cache)
    Ready(IpAddr),
    /// Lookup in flight; the answer arrives via [`EventHandler::on_resolved`]
    Pending,
}

/// Mutual-TLS session parameters handed to [`NetworkStack::open`]
///
/// The blobs are PEM text. The stack copies or parses them while opening; it
/// must not keep the borrows.
#[derive(Debug, Clone, Copy)]
pub struct TlsSessionConfig<'a> {
    /// Hostname used for SNI and certificate name checks
    pub server_name: &'a str,
    /// Trust anchor for the server chain
    pub ca_cert: &'a [u8],
    /// Our certificate, presented during the handshake
    pub client_cert: &'a [u8],
    /// Private key matching `client_cert`
    pub client_key: &'a [u8],
}

/// Notification sink driven by [`NetworkStack::poll`]
///
/// Implementations record what happened and return; they never block and
/// never call back into the stack.
pub trait EventHandler {
    /// A pending lookup finished. `None` means no address was found.
    fn on_resolved(&mut self, hostname: &str, address: Option<IpAddr>);

    /// Transport connect + TLS handshake finished.
    fn on_connected(&mut self, result: Result<(), StackError>);

    /// Decrypted application data arrived.
    ///
    /// An empty chunk means the peer closed the connection. Returns the number
    /// of bytes the stack should acknowledge to its flow control.
    fn on_data_received(&mut self, chunk: &[u8]) -> usize;

    /// Fatal transport error. The stack has already released the connection;
    /// its handle must not be passed to [`NetworkStack::close`] afterwards.
    fn on_error(&mut self, error: StackError);
}

/// One logical TLS connection on a cooperative, callback-driven stack
pub trait NetworkStack {
    /// Opaque per-connection resource (control block, socket slot, ...)
    type Handle;

    /// Start resolving `hostname`, answering from cache when possible.
    ///
    /// `Err` means the lookup could not even be started.
    fn resolve(&mut self, hostname: &str) -> Result<Resolution, StackError>;

    /// Create the TLS session from `tls` and start connecting to `remote`.
    ///
    /// Completion is reported through [`EventHandler::on_connected`].
    fn open(
        &mut self,
        remote: SocketAddr,
        tls: &TlsSessionConfig<'_>,
    ) -> Result<Self::Handle, StackError>;

    /// Queue `data` for transmission (copied by the stack).
    fn write(&mut self, handle: &Self::Handle, data: &[u8]) -> Result<(), StackError>;

    /// Push queued data onto the wire now.
    fn flush(&mut self, handle: &Self::Handle) -> Result<(), StackError>;

    /// Close the connection and release the handle.
    fn close(&mut self, handle: Self::Handle);

    /// Drive one iteration of event processing, delivering due
    /// notifications to `events` in the order the transport produced them.
    fn poll(&mut self, events: &mut dyn EventHandler);
}
