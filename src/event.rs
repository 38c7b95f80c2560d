//! Session events and the host-supplied sink that consumes them.
//!
//! Corresponds to `tf::net::NetEvent`, generalized from a client-shaped
//! "lines and prompts" event set to the raw protocol events a transport-
//! agnostic engine must expose, and changed from an owned `Vec<NetEvent>`
//! return value to a borrowed sink so `Will`/`Do` can carry a writable
//! accept flag (see `DESIGN.md`).

use std::fmt;

/// The five diagnostic categories the engine can report.
///
/// Modeled as a hand-written `Display`/`Error` pair rather than via
/// `thiserror`, matching `tf::config::ConfigError` and `tf::pattern::PatternError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// API misuse, e.g. initializing compression twice.
    EBadVal,
    /// A buffer growth request that could not be satisfied.
    ENoMem,
    /// The subnegotiation buffer ceiling (16384 bytes) would be exceeded.
    EOverflow,
    /// An illegal byte sequence was received from the peer.
    EProtocol,
    /// A zlib/deflate error.
    ECompress,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::EBadVal => "EBADVAL",
            ErrorCode::ENoMem => "ENOMEM",
            ErrorCode::EOverflow => "EOVERFLOW",
            ErrorCode::EProtocol => "EPROTOCOL",
            ErrorCode::ECompress => "ECOMPRESS",
        };
        f.write_str(name)
    }
}

impl std::error::Error for ErrorCode {}

/// A negotiation notification the sink may accept or refuse.
///
/// Starts with `accept = false` (default deny); the sink flips it to `true`
/// to grant the request. Ignored in proxy mode, where negotiation events
/// carry no accept/deny decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationRequest {
    pub telopt: u8,
    pub accept: bool,
}

/// A fully decoded subnegotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnegotiation {
    pub telopt: u8,
    pub body: Vec<u8>,
    /// Argument vector for recognized telopts (TTYPE/ENVIRON/NEW-ENVIRON/MSSP/ZMP).
    pub argv: Option<Vec<Vec<u8>>>,
}

/// One event produced or consumed while driving a [`crate::Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Payload bytes extracted from the inbound stream (IAC unescaped).
    Data(Vec<u8>),
    /// Bytes the engine wishes to transmit; the host must deliver these as-is.
    Send(Vec<u8>),
    /// A standalone `IAC <cmd>` was received (cmd not WILL/WONT/DO/DONT/SB).
    Iac(u8),
    /// The peer sent `WILL <telopt>`. In non-proxy mode the accept flag is writable.
    Will(NegotiationRequest),
    /// The peer sent `WONT <telopt>`.
    Wont(u8),
    /// The peer sent `DO <telopt>`. In non-proxy mode the accept flag is writable.
    Do(NegotiationRequest),
    /// The peer sent `DONT <telopt>`.
    Dont(u8),
    /// A complete `IAC SB ... IAC SE` frame.
    Subnegotiation(Subnegotiation),
    /// Compression has been enabled (`true`) or disabled (`false`).
    Compress(bool),
    /// A non-fatal diagnostic.
    Warning(ErrorCode, String),
    /// A fatal diagnostic; the session should be considered no longer valid
    /// for the subsystem named by the error code.
    Error(ErrorCode, String),
}

/// A host-supplied capability that consumes one [`Event`] at a time.
///
/// Invoked synchronously from within [`crate::Session`] methods. The event is
/// passed by `&mut` so that, for `Will`/`Do`, the sink can flip
/// [`NegotiationRequest::accept`] before the engine reads it back; for every
/// other variant the sink is expected only to observe it. Implementors must
/// not attempt to re-enter the same session from inside `on_event` — in
/// practice the `&mut dyn EventSink` borrow makes this a compile error for
/// any sink that itself holds `&mut Session`.
pub trait EventSink {
    fn on_event(&mut self, event: &mut Event);
}

/// Convenience sink that appends every event to a `Vec`, useful for tests
/// and for hosts that prefer to drain events after the call returns rather
/// than react to them inline.
#[derive(Debug, Default)]
pub struct VecSink(pub Vec<Event>);

impl EventSink for VecSink {
    fn on_event(&mut self, event: &mut Event) {
        self.0.push(event.clone());
    }
}

impl EventSink for Vec<Event> {
    fn on_event(&mut self, event: &mut Event) {
        self.push(event.clone());
    }
}
