//! A transport-agnostic TELNET protocol engine.
//!
//! `tncore` implements the wire-level option negotiation machinery (RFC
//! 854/855/1143), a handful of well-known subnegotiations (TTYPE, ENVIRON /
//! NEW-ENVIRON, MSSP, ZMP), and MCCP2 stream compression, all behind a
//! [`Session`] that never touches a socket: feed it bytes, it calls back
//! into an [`EventSink`]; ask it to negotiate or send data, it calls back
//! with the bytes to write.
//!
//! Hosts own the transport (TCP, a test harness, a record/replay log) and
//! the policy of which options to allow; this crate owns only the protocol
//! state machine, the same split `tf::net::Protocol` draws between a
//! connection and the bytes flowing through it.

mod buffer;
mod compress;
mod event;
mod qtable;
mod session;
mod subneg;
mod telopt;

pub use event::{ErrorCode, Event, EventSink, NegotiationRequest, Subnegotiation, VecSink};
pub use qtable::{Policy, PolicyTable, QState};
pub use session::{Flags, Session};
pub use telopt::{option, DO, DONT, EOR, GA, IAC, IS, NOP, SB, SE, SEND, WILL, WONT};
