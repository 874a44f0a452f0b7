#![deny(unsafe_code)]
#![deny(warnings)]
//! Simulated stack, clock and delay
//!
//! Virtual time only moves when [`SimDelay`] is asked to wait (or, with
//! [`SimTime::with_tick`], on every clock read), so timeout behaviour can be
//! exercised to the microsecond without sleeping. [`SimStack`] replays a
//! script of stack notifications and records every call the facade makes.

use core::cell::Cell;
use core::net::{IpAddr, SocketAddr};
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use hal_abstractions::{
    EventHandler, MonotonicClock, NetworkStack, Resolution, StackError, TlsSessionConfig,
};
use heapless::{String, Vec};

/// Largest data chunk a script entry can carry
pub const SIM_CHUNK_CAPACITY: usize = 512;
/// Scripted notifications that can be pending at once
pub const SIM_SCRIPT_CAPACITY: usize = 16;
/// Bytes of outgoing data the stack records
pub const SIM_SENT_CAPACITY: usize = 1024;

/// lwIP `ERR_MEM`
const ERR_MEM: i32 = -1;
/// lwIP `ERR_ARG`
const ERR_ARG: i32 = -16;

/// Shared virtual time base
pub struct SimTime {
    now_ns: Cell<u64>,
    tick_ns: u64,
}

impl SimTime {
    pub const fn new() -> Self {
        Self {
            now_ns: Cell::new(0),
            tick_ns: 0,
        }
    }

    /// Clock that also advances by `tick` every time it is read
    pub fn with_tick(tick: Duration) -> Self {
        Self {
            now_ns: Cell::new(0),
            tick_ns: u64::try_from(tick.as_nanos()).unwrap_or(u64::MAX),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.advance_ns(u64::try_from(by.as_nanos()).unwrap_or(u64::MAX));
    }

    fn advance_ns(&self, ns: u64) {
        self.now_ns.set(self.now_ns.get().saturating_add(ns));
    }

    /// Current virtual time since the origin
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.now_ns.get())
    }

    fn now_micros(&self) -> u64 {
        let now = self.now_ns.get();
        self.advance_ns(self.tick_ns);
        now / 1_000
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub struct SimClock<'a>(pub &'a SimTime);

impl MonotonicClock for SimClock<'_> {
    fn now_micros(&self) -> u64 {
        self.0.now_micros()
    }
}

/// Delay that advances virtual time instead of sleeping
pub struct SimDelay<'a> {
    time: &'a SimTime,
    yields: usize,
}

impl<'a> SimDelay<'a> {
    pub fn new(time: &'a SimTime) -> Self {
        Self { time, yields: 0 }
    }

    pub fn yields(&self) -> usize {
        self.yields
    }
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.yields += 1;
        self.time.advance_ns(u64::from(ns));
    }
}

/// How the simulated resolver answers
#[derive(Debug, Clone, Copy)]
pub enum SimDns {
    /// Synchronous answer from cache
    Cached(IpAddr),
    /// Callback after `after`; `None` reports "no address"
    Answer {
        after: Duration,
        address: Option<IpAddr>,
    },
    /// Lookup cannot be started
    Refuse(i32),
}

/// How the simulated handshake ends, relative to `open`
#[derive(Debug, Clone, Copy)]
pub enum SimHandshake {
    CompleteAfter(Duration),
    FailAfter(Duration, i32),
    Never,
}

/// A notification the stack will deliver during `poll`
#[derive(Debug, Clone)]
pub enum SimEvent {
    Resolved(Option<IpAddr>),
    Connected(Result<(), StackError>),
    /// Application data; an empty chunk is a peer close
    Data(Vec<u8, SIM_CHUNK_CAPACITY>),
    Error(StackError),
}

#[derive(Debug, Clone)]
struct Scheduled {
    at_us: u64,
    event: SimEvent,
}

/// Handle issued by [`SimStack::open`]; not `Clone`, so it can only be
/// closed once
#[derive(Debug, PartialEq, Eq)]
pub struct SimHandle(u32);

/// Scripted stand-in for a callback-driven TLS stack
pub struct SimStack<'a> {
    time: &'a SimTime,
    dns: SimDns,
    handshake: SimHandshake,
    script: Vec<Scheduled, SIM_SCRIPT_CAPACITY>,
    hostname: String<64>,
    next_handle: u32,

    /// Error returned by the next `open`
    pub open_error: Option<StackError>,
    /// Error returned by every `write`
    pub write_error: Option<StackError>,

    pub resolve_calls: usize,
    pub open_calls: usize,
    pub close_calls: usize,
    pub flush_calls: usize,
    pub polls: usize,
    pub acknowledged: usize,
    pub last_remote: Option<SocketAddr>,
    pub last_server_name: String<64>,
    pub sent: Vec<u8, SIM_SENT_CAPACITY>,
}

impl<'a> SimStack<'a> {
    pub fn new(time: &'a SimTime, dns: SimDns, handshake: SimHandshake) -> Self {
        Self {
            time,
            dns,
            handshake,
            script: Vec::new(),
            hostname: String::new(),
            next_handle: 1,
            open_error: None,
            write_error: None,
            resolve_calls: 0,
            open_calls: 0,
            close_calls: 0,
            flush_calls: 0,
            polls: 0,
            acknowledged: 0,
            last_remote: None,
            last_server_name: String::new(),
            sent: Vec::new(),
        }
    }

    pub fn set_dns(&mut self, dns: SimDns) {
        self.dns = dns;
    }

    pub fn set_handshake(&mut self, handshake: SimHandshake) {
        self.handshake = handshake;
    }

    /// Deliver `event` on the first poll at least `after` from now
    ///
    /// Events due in the same poll are delivered in scheduling order. Returns
    /// `false` if the script is full.
    pub fn schedule(&mut self, after: Duration, event: SimEvent) -> bool {
        let at_us = self.now_us().saturating_add(as_micros(after));
        self.script.push(Scheduled { at_us, event }).is_ok()
    }

    /// Schedule application data (truncated to [`SIM_CHUNK_CAPACITY`])
    pub fn deliver_data(&mut self, after: Duration, bytes: &[u8]) -> bool {
        let mut chunk = Vec::new();
        let len = bytes.len().min(SIM_CHUNK_CAPACITY);
        if chunk.extend_from_slice(&bytes[..len]).is_err() {
            return false;
        }
        self.schedule(after, SimEvent::Data(chunk))
    }

    pub fn close_from_peer(&mut self, after: Duration) -> bool {
        self.schedule(after, SimEvent::Data(Vec::new()))
    }

    pub fn fail_transport(&mut self, after: Duration, code: i32) -> bool {
        self.schedule(after, SimEvent::Error(StackError::new(code)))
    }

    pub fn complete_handshake(&mut self, after: Duration) -> bool {
        self.schedule(after, SimEvent::Connected(Ok(())))
    }

    pub fn pending_events(&self) -> usize {
        self.script.len()
    }

    fn now_us(&self) -> u64 {
        self.time.now_ns.get() / 1_000
    }

    fn deliver(&mut self, event: SimEvent, events: &mut dyn EventHandler) {
        match event {
            SimEvent::Resolved(address) => events.on_resolved(&self.hostname, address),
            SimEvent::Connected(result) => events.on_connected(result),
            SimEvent::Data(chunk) => {
                self.acknowledged += events.on_data_received(&chunk);
            }
            SimEvent::Error(e) => events.on_error(e),
        }
    }
}

fn as_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl NetworkStack for SimStack<'_> {
    type Handle = SimHandle;

    fn resolve(&mut self, hostname: &str) -> Result<Resolution, StackError> {
        self.resolve_calls += 1;
        self.hostname.clear();
        self.hostname
            .push_str(hostname)
            .map_err(|()| StackError::new(ERR_ARG))?;
        match self.dns {
            SimDns::Cached(address) => Ok(Resolution::Ready(address)),
            SimDns::Answer { after, address } => {
                self.schedule(after, SimEvent::Resolved(address));
                Ok(Resolution::Pending)
            }
            SimDns::Refuse(code) => Err(StackError::new(code)),
        }
    }

    fn open(
        &mut self,
        remote: SocketAddr,
        tls: &TlsSessionConfig<'_>,
    ) -> Result<Self::Handle, StackError> {
        self.open_calls += 1;
        if let Some(e) = self.open_error.take() {
            return Err(e);
        }
        self.last_remote = Some(remote);
        self.last_server_name.clear();
        self.last_server_name
            .push_str(tls.server_name)
            .map_err(|()| StackError::new(ERR_ARG))?;

        match self.handshake {
            SimHandshake::CompleteAfter(after) => {
                self.schedule(after, SimEvent::Connected(Ok(())));
            }
            SimHandshake::FailAfter(after, code) => {
                self.schedule(after, SimEvent::Connected(Err(StackError::new(code))));
            }
            SimHandshake::Never => {}
        }

        let handle = SimHandle(self.next_handle);
        self.next_handle += 1;
        Ok(handle)
    }

    fn write(&mut self, _handle: &Self::Handle, data: &[u8]) -> Result<(), StackError> {
        if let Some(e) = self.write_error {
            return Err(e);
        }
        self.sent
            .extend_from_slice(data)
            .map_err(|()| StackError::new(ERR_MEM))
    }

    fn flush(&mut self, _handle: &Self::Handle) -> Result<(), StackError> {
        self.flush_calls += 1;
        Ok(())
    }

    fn close(&mut self, _handle: Self::Handle) {
        self.close_calls += 1;
    }

    fn poll(&mut self, events: &mut dyn EventHandler) {
        self.polls += 1;
        let now = self.now_us();
        let mut i = 0;
        while i < self.script.len() {
            if self.script[i].at_us <= now {
                let due = self.script.remove(i);
                self.deliver(due.event, events);
            } else {
                i += 1;
            }
        }
    }
}
