//! The core protocol engine.
//!
//! Grounded on the two halves of `tf::net::Protocol` and `tf::telnet`: the
//! byte-at-a-time `State` machine that walks an inbound chunk (here
//! [`RecvState`]), and `Protocol::dispatch`'s job of turning a finished
//! command into a callback. The donor owns a socket and calls back into a
//! `World`; this engine owns no I/O and calls back into an [`EventSink`]
//! instead, so the same state machine works over any transport the host
//! chooses to drive it with.

use crate::buffer::SbBuffer;
use crate::compress::{Deflator, Inflator};
use crate::event::{ErrorCode, Event, EventSink, NegotiationRequest, Subnegotiation};
use crate::qtable::{self, Policy, PolicyTable, Polarity, QState, QTable, Side};
use crate::subneg;
use crate::telopt::{option, DO, DONT, IAC, SB, SE, WILL, WONT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecvState {
    Data,
    Iac,
    Will,
    Wont,
    Do,
    Dont,
    Sb,
    SbData,
    SbDataIac,
}

fn is_known_subneg_telopt(t: u8) -> bool {
    matches!(t, option::ZMP | option::TTYPE | option::ENVIRON | option::NEW_ENVIRON | option::MSSP)
}

/// Feature flags fixed for the lifetime of a [`Session`]. A plain struct of
/// bools, in the donor's idiom of avoiding a flags crate for a handful of
/// switches (contrast a much larger flag set, which would warrant one).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// Bypass the Q-Method entirely and mirror every negotiation straight
    /// back (WILL->DO, DO->WILL, and so on), as a passthrough proxy would.
    pub proxy: bool,
}

/// A transport-agnostic TELNET session: feed it inbound bytes, it calls back
/// into an [`EventSink`]; ask it to send data or negotiate, it calls back
/// with the bytes to put on the wire. It never touches a socket itself.
///
/// Carries an opaque host-owned context value of type `U`, defaulted to
/// `()` for hosts with nothing to stash. Construct with [`Session::new`] or,
/// to supply a context, [`Session::with_context`].
pub struct Session<U = ()> {
    qtable: QTable,
    policy: PolicyTable,
    proxy: bool,
    state: RecvState,
    data_run: Vec<u8>,
    sb_telopt: u8,
    sb_buf: SbBuffer,
    inflator: Option<Inflator>,
    deflator: Option<Deflator>,
    /// Compressed bytes received but not yet consumed by `inflator`,
    /// re-prefixed to the next `recv` call.
    compressed_backlog: Vec<u8>,
    context: U,
}

impl Session<()> {
    /// A session with no user context. `policy` defaults to refusing every
    /// telopt when `None`.
    pub fn new(flags: Flags, policy: Option<PolicyTable>) -> Self {
        Self::with_context(flags, policy, ())
    }
}

impl<U> Session<U> {
    /// A session carrying an opaque `context` value the host can retrieve
    /// later via [`Session::context`]/[`Session::context_mut`].
    pub fn with_context(flags: Flags, policy: Option<PolicyTable>, context: U) -> Self {
        Self {
            qtable: QTable::new(),
            policy: policy.unwrap_or_default(),
            proxy: flags.proxy,
            state: RecvState::Data,
            data_run: Vec::new(),
            sb_telopt: 0,
            sb_buf: SbBuffer::new(),
            inflator: None,
            deflator: None,
            compressed_backlog: Vec::new(),
            context,
        }
    }

    pub fn context(&self) -> &U {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut U {
        &mut self.context
    }

    pub fn is_compressing_inbound(&self) -> bool {
        self.inflator.is_some()
    }

    pub fn is_compressing_outbound(&self) -> bool {
        self.deflator.is_some()
    }

    /// Tears down the compression stream and resets the receive state
    /// machine to idle, without dropping the session itself. Idempotent,
    /// and safe to call whether or not compression was ever negotiated.
    pub fn close(&mut self) {
        self.inflator = None;
        self.deflator = None;
        self.compressed_backlog.clear();
        self.data_run.clear();
        self.sb_buf.reset();
        self.sb_telopt = 0;
        self.state = RecvState::Data;
    }

    fn policy_of(&self, telopt: u8) -> Policy {
        self.policy.policy(telopt)
    }

    // ---- receive path --------------------------------------------------

    /// Feeds one chunk of inbound bytes through the session. Fully
    /// restartable across chunk boundaries: partial commands, partial
    /// subnegotiations, and a compression handshake landing mid-chunk are
    /// all carried correctly into the next call. Once the peer's deflate
    /// stream itself ends, compression is torn down, `Compress(false)` is
    /// emitted, and whatever follows is read as plaintext again.
    pub fn recv(&mut self, sink: &mut dyn EventSink, data: &[u8]) {
        let mut pending = data.to_vec();
        loop {
            if self.inflator.is_some() {
                let mut input = std::mem::take(&mut self.compressed_backlog);
                input.extend_from_slice(&pending);
                let mut plain = Vec::new();
                let (consumed, ended) = match self.inflator.as_mut().unwrap().inflate(&input, &mut plain) {
                    Ok(result) => result,
                    Err(code) => {
                        self.emit(sink, Event::Error(code, "zlib inflate failure".into()));
                        return;
                    }
                };
                if ended {
                    self.inflator = None;
                    self.emit(sink, Event::Compress(false));
                    pending = input[consumed..].to_vec();
                } else {
                    self.compressed_backlog = input[consumed..].to_vec();
                    pending.clear();
                }
                if let Some(remainder) = self.feed(&plain, sink) {
                    let mut spliced = remainder.to_vec();
                    spliced.extend_from_slice(&pending);
                    pending = spliced;
                    continue;
                }
                if ended {
                    continue;
                }
                break;
            }
            match self.feed(&pending, sink) {
                Some(remainder) => {
                    pending = remainder.to_vec();
                    continue;
                }
                None => break,
            }
        }
        self.flush_data(sink);
    }

    /// Walks the plaintext byte machine. Returns `Some(rest)` if a
    /// subnegotiation just turned compression on mid-slice, where `rest` is
    /// the (still compressed) tail of `data` that must now go through the
    /// inflator before continuing.
    fn feed<'d>(&mut self, data: &'d [u8], sink: &mut dyn EventSink) -> Option<&'d [u8]> {
        for (i, &b) in data.iter().enumerate() {
            if self.step(b, sink) {
                return Some(&data[i + 1..]);
            }
        }
        None
    }

    fn step(&mut self, b: u8, sink: &mut dyn EventSink) -> bool {
        match self.state {
            RecvState::Data => {
                if b == IAC {
                    self.flush_data(sink);
                    self.state = RecvState::Iac;
                } else {
                    self.data_run.push(b);
                }
                false
            }
            RecvState::Iac => {
                self.state = RecvState::Data;
                match b {
                    IAC => {
                        self.data_run.push(IAC);
                        false
                    }
                    WILL => {
                        self.state = RecvState::Will;
                        false
                    }
                    WONT => {
                        self.state = RecvState::Wont;
                        false
                    }
                    DO => {
                        self.state = RecvState::Do;
                        false
                    }
                    DONT => {
                        self.state = RecvState::Dont;
                        false
                    }
                    SB => {
                        self.state = RecvState::Sb;
                        false
                    }
                    SE => {
                        self.warn(sink, ErrorCode::EProtocol, "IAC SE received outside a subnegotiation");
                        false
                    }
                    other => {
                        self.emit(sink, Event::Iac(other));
                        false
                    }
                }
            }
            RecvState::Will => {
                self.state = RecvState::Data;
                self.handle_enable(Side::Him, b, sink);
                false
            }
            RecvState::Do => {
                self.state = RecvState::Data;
                self.handle_enable(Side::Us, b, sink);
                false
            }
            RecvState::Wont => {
                self.state = RecvState::Data;
                self.handle_disable(Side::Him, b, sink);
                false
            }
            RecvState::Dont => {
                self.state = RecvState::Data;
                self.handle_disable(Side::Us, b, sink);
                false
            }
            RecvState::Sb => {
                self.sb_telopt = b;
                self.sb_buf.reset();
                self.state = RecvState::SbData;
                false
            }
            RecvState::SbData => {
                if b == IAC {
                    self.state = RecvState::SbDataIac;
                } else if let Err(overflow) = self.sb_buf.push(b) {
                    self.warn(sink, overflow.into(), "subnegotiation body exceeded the 16384 byte ceiling");
                    self.sb_buf.reset();
                    self.state = RecvState::Data;
                }
                false
            }
            RecvState::SbDataIac => match b {
                IAC => {
                    let _ = self.sb_buf.push(IAC);
                    self.state = RecvState::SbData;
                    false
                }
                SE => {
                    self.state = RecvState::Data;
                    self.finish_subnegotiation(sink)
                }
                _ => {
                    self.warn(sink, ErrorCode::EProtocol, "unterminated subnegotiation (IAC not followed by SE)");
                    self.sb_buf.reset();
                    // The stray IAC didn't introduce SE; the current byte is
                    // re-dispatched as if it had just followed a fresh IAC.
                    self.state = RecvState::Iac;
                    self.step(b, sink)
                }
            },
        }
    }

    fn handle_enable(&mut self, side: Side, telopt: u8, sink: &mut dyn EventSink) {
        if self.proxy {
            let event = self.negotiation_event(side, telopt, true);
            self.emit(sink, event);
            return;
        }

        let entry = self.qtable.entry(telopt);
        let state = if side == Side::Him { entry.him } else { entry.us };
        let policy = self.policy_of(telopt);
        let default_accept = if side == Side::Him { policy.allow_do } else { policy.allow_will };

        let mut outcome = qtable::recv_enable(state, side, default_accept);
        let mut final_accept = default_accept;
        if outcome.emit_event {
            let mut event = self.negotiation_event(side, telopt, default_accept);
            sink.on_event(&mut event);
            final_accept = match &event {
                Event::Will(r) | Event::Do(r) => r.accept,
                _ => default_accept,
            };
            if final_accept != default_accept && state == QState::No {
                outcome = qtable::recv_enable(state, side, final_accept);
            }
        }
        self.apply_enable_outcome(side, telopt, outcome, sink);
    }

    fn handle_disable(&mut self, side: Side, telopt: u8, sink: &mut dyn EventSink) {
        if self.proxy {
            let event = if side == Side::Him { Event::Wont(telopt) } else { Event::Dont(telopt) };
            self.emit(sink, event);
            return;
        }

        let entry = self.qtable.entry(telopt);
        let state = if side == Side::Him { entry.him } else { entry.us };
        let outcome = qtable::recv_disable(state);
        if outcome.emit_event {
            let event = if side == Side::Him { Event::Wont(telopt) } else { Event::Dont(telopt) };
            self.emit(sink, event);
        }
        self.apply_disable_outcome(side, telopt, outcome, sink);
    }

    fn negotiation_event(&self, side: Side, telopt: u8, accept: bool) -> Event {
        let req = NegotiationRequest { telopt, accept };
        if side == Side::Him {
            Event::Will(req)
        } else {
            Event::Do(req)
        }
    }

    fn apply_enable_outcome(&mut self, side: Side, telopt: u8, outcome: qtable::RecvOutcome, sink: &mut dyn EventSink) {
        if let Some(warning) = outcome.warning {
            self.warn(sink, ErrorCode::EProtocol, warning);
        }
        let mut entry = self.qtable.entry(telopt);
        if side == Side::Him {
            entry.him = outcome.new_state;
        } else {
            entry.us = outcome.new_state;
        }
        self.qtable.set(telopt, entry);
        if let Some(polarity) = outcome.send {
            self.send_polarity(side, polarity, telopt, sink);
        }
    }

    fn apply_disable_outcome(&mut self, side: Side, telopt: u8, outcome: qtable::RecvOutcome, sink: &mut dyn EventSink) {
        let mut entry = self.qtable.entry(telopt);
        if side == Side::Him {
            entry.him = outcome.new_state;
        } else {
            entry.us = outcome.new_state;
        }
        self.qtable.set(telopt, entry);
        if let Some(polarity) = outcome.send {
            self.send_polarity(side, polarity, telopt, sink);
        }
    }

    fn send_polarity(&self, side: Side, polarity: Polarity, telopt: u8, sink: &mut dyn EventSink) {
        let cmd = match (side, polarity) {
            (Side::Him, Polarity::Positive) => DO,
            (Side::Him, Polarity::Negative) => DONT,
            (Side::Us, Polarity::Positive) => WILL,
            (Side::Us, Polarity::Negative) => WONT,
        };
        self.send_cmd(cmd, telopt, sink);
    }

    fn finish_subnegotiation(&mut self, sink: &mut dyn EventSink) -> bool {
        let telopt = self.sb_telopt;
        let body = self.sb_buf.as_slice().to_vec();
        self.sb_buf.reset();

        let argv = subneg::decode(telopt, &body);
        if argv.is_none() && is_known_subneg_telopt(telopt) {
            let msg = if telopt == option::ZMP {
                "incomplete ZMP frame".to_string()
            } else {
                format!("malformed subnegotiation body for telopt {telopt}")
            };
            self.warn(sink, ErrorCode::EProtocol, msg);
        }
        self.emit(sink, Event::Subnegotiation(Subnegotiation { telopt, body, argv }));

        if telopt == option::MCCP2 && self.inflator.is_none() {
            let negotiated = self.proxy || {
                let entry = self.qtable.entry(telopt);
                entry.him == QState::Yes || entry.us == QState::Yes
            };
            if negotiated {
                self.inflator = Some(Inflator::new());
                self.emit(sink, Event::Compress(true));
                return true;
            }
        }
        false
    }

    fn flush_data(&mut self, sink: &mut dyn EventSink) {
        if !self.data_run.is_empty() {
            let data = std::mem::take(&mut self.data_run);
            self.emit(sink, Event::Data(data));
        }
    }

    fn emit(&self, sink: &mut dyn EventSink, event: Event) {
        let mut event = event;
        sink.on_event(&mut event);
    }

    fn warn(&self, sink: &mut dyn EventSink, code: ErrorCode, msg: impl Into<String>) {
        self.emit(sink, Event::Warning(code, msg.into()));
    }

    // ---- transmit path --------------------------------------------------

    fn send_cmd(&self, cmd: u8, telopt: u8, sink: &mut dyn EventSink) {
        self.emit(sink, Event::Send(vec![IAC, cmd, telopt]));
    }

    /// Doubles every `0xFF` byte, the escaping every DATA and SB body needs.
    fn escape(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bytes.len());
        for &b in bytes {
            out.push(b);
            if b == IAC {
                out.push(IAC);
            }
        }
        out
    }

    /// Sends application data, IAC-escaping it and routing it through the
    /// outbound compressor if one is active.
    pub fn send_data(&mut self, data: &[u8], sink: &mut dyn EventSink) {
        let escaped = Self::escape(data);
        if let Some(deflator) = self.deflator.as_mut() {
            let mut compressed = Vec::new();
            match deflator.deflate(&escaped, &mut compressed) {
                Ok(()) => self.emit(sink, Event::Send(compressed)),
                Err(code) => self.emit(sink, Event::Error(code, "zlib deflate failure".into())),
            }
        } else {
            self.emit(sink, Event::Send(escaped));
        }
    }

    /// Sends a standalone command byte, e.g. `IAC GA` or `IAC NOP`.
    pub fn send_iac(&self, cmd: u8, sink: &mut dyn EventSink) {
        self.emit(sink, Event::Send(vec![IAC, cmd]));
    }

    /// Asks the peer to enable `telopt` on our side (`IAC WILL telopt`),
    /// subject to the Q-Method's queueing rules.
    pub fn request_will(&mut self, telopt: u8, sink: &mut dyn EventSink) {
        self.request(Side::Us, true, telopt, sink);
    }

    pub fn request_wont(&mut self, telopt: u8, sink: &mut dyn EventSink) {
        self.request(Side::Us, false, telopt, sink);
    }

    /// Asks the peer to enable `telopt` on their side (`IAC DO telopt`).
    pub fn request_do(&mut self, telopt: u8, sink: &mut dyn EventSink) {
        self.request(Side::Him, true, telopt, sink);
    }

    pub fn request_dont(&mut self, telopt: u8, sink: &mut dyn EventSink) {
        self.request(Side::Him, false, telopt, sink);
    }

    fn request(&mut self, side: Side, enable: bool, telopt: u8, sink: &mut dyn EventSink) {
        let mut entry = self.qtable.entry(telopt);
        let state = if side == Side::Him { entry.him } else { entry.us };
        let outcome = if enable { qtable::request_enable(state) } else { qtable::request_disable(state) };
        if side == Side::Him {
            entry.him = outcome.new_state;
        } else {
            entry.us = outcome.new_state;
        }
        self.qtable.set(telopt, entry);
        if outcome.send {
            let cmd = match (side, enable) {
                (Side::Us, true) => WILL,
                (Side::Us, false) => WONT,
                (Side::Him, true) => DO,
                (Side::Him, false) => DONT,
            };
            self.send_cmd(cmd, telopt, sink);
        }
    }

    fn frame_sb(telopt: u8, body: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(body.len() + 5);
        frame.push(IAC);
        frame.push(SB);
        frame.push(telopt);
        frame.extend(Self::escape(body));
        frame.push(IAC);
        frame.push(SE);
        frame
    }

    /// Sends a complete `IAC SB telopt ... IAC SE` frame, escaping the body.
    /// In proxy mode, sending MCCP2's activation frame this way starts the
    /// deflate stream immediately after the `SE` byte, mirroring what
    /// `begin_compress2` does outside proxy mode.
    pub fn subnegotiation(&mut self, telopt: u8, body: &[u8], sink: &mut dyn EventSink) {
        self.emit(sink, Event::Send(Self::frame_sb(telopt, body)));
        if self.proxy && telopt == option::MCCP2 && self.deflator.is_none() {
            self.deflator = Some(Deflator::new());
            self.emit(sink, Event::Compress(true));
        }
    }

    /// Sends a complete subnegotiation built from tag-prefixed pairs, as
    /// ENVIRON/NEW-ENVIRON and MSSP frame their VAR/VALUE segments: each
    /// pair becomes the one tag byte followed by the string's bytes, with
    /// no NUL terminator.
    pub fn format_sb(&mut self, telopt: u8, pairs: &[(u8, &str)], sink: &mut dyn EventSink) {
        let mut body = Vec::new();
        for &(tag, value) in pairs {
            body.push(tag);
            body.extend_from_slice(value.as_bytes());
        }
        self.subnegotiation(telopt, &body, sink);
    }

    /// Sends a ZMP command (telopt 93), NUL-terminating every argument.
    pub fn send_zmp(&mut self, argv: &[&[u8]], sink: &mut dyn EventSink) {
        let body = subneg::encode_zmp(argv);
        self.subnegotiation(option::ZMP, &body, sink);
    }

    /// Formats `text` and sends it unchanged through `send_data`: IAC-escaped,
    /// with no line-ending rewrite.
    pub fn raw_printf(&mut self, text: &str, sink: &mut dyn EventSink) {
        self.send_data(text.as_bytes(), sink);
    }

    /// Formats `text`, translates `\r` to `{CR, NUL}` and `\n` to `{CR, LF}`,
    /// doubles `0xFF`, and sends the result. Unlike `send_data`, the
    /// translation pass and the IAC doubling happen together in one sweep,
    /// so this does not also route through `Self::escape`.
    pub fn printf(&mut self, text: &str, sink: &mut dyn EventSink) {
        let mut translated = Vec::with_capacity(text.len());
        for &b in text.as_bytes() {
            match b {
                b'\r' => translated.extend_from_slice(&[b'\r', 0]),
                b'\n' => translated.extend_from_slice(&[b'\r', b'\n']),
                IAC => translated.extend_from_slice(&[IAC, IAC]),
                other => translated.push(other),
            }
        }
        if let Some(deflator) = self.deflator.as_mut() {
            let mut compressed = Vec::new();
            match deflator.deflate(&translated, &mut compressed) {
                Ok(()) => self.emit(sink, Event::Send(compressed)),
                Err(code) => self.emit(sink, Event::Error(code, "zlib deflate failure".into())),
            }
        } else {
            self.emit(sink, Event::Send(translated));
        }
    }

    /// Server-only: emits the uncompressed `IAC SB MCCP2 IAC SE` activation
    /// marker directly, then starts deflating everything this session sends
    /// from that point on.
    pub fn begin_compress2(&mut self, sink: &mut dyn EventSink) {
        if self.deflator.is_some() {
            self.warn(sink, ErrorCode::EBadVal, "compression already initialized for this session");
            return;
        }
        self.emit(sink, Event::Send(vec![IAC, SB, option::MCCP2, IAC, SE]));
        self.deflator = Some(Deflator::new());
        self.emit(sink, Event::Compress(true));
    }

    /// Drives the Q-Method host-initiated transition for `cmd` against
    /// `telopt`, emitting the wire bytes only when RFC 1143 calls for an
    /// actual transmission rather than a request queued behind one already
    /// in flight.
    pub fn send_negotiate(&mut self, cmd: u8, telopt: u8, sink: &mut dyn EventSink) {
        match cmd {
            WILL => self.request_will(telopt, sink),
            WONT => self.request_wont(telopt, sink),
            DO => self.request_do(telopt, sink),
            DONT => self.request_dont(telopt, sink),
            _ => self.warn(sink, ErrorCode::EBadVal, "send_negotiate called with a non-negotiation command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VecSink;
    use crate::telopt::option;

    fn events(session: &mut Session<()>, data: &[u8]) -> Vec<Event> {
        let mut sink = VecSink::default();
        session.recv(&mut sink, data);
        sink.0
    }

    #[test]
    fn accepted_do_ttype_replies_will_once_and_does_not_loop() {
        let policy = PolicyTable::new().allow_local(option::TTYPE);
        let mut session = Session::new(Flags::default(), Some(policy));
        let evs = events(&mut session, &[IAC, DO, option::TTYPE]);
        assert!(matches!(evs[0], Event::Do(NegotiationRequest { telopt, accept: true }) if telopt == option::TTYPE));
        assert_eq!(evs[1], Event::Send(vec![IAC, WILL, option::TTYPE]));

        // A repeat DO must not re-trigger the WILL reply (state is now Yes).
        let evs = events(&mut session, &[IAC, DO, option::TTYPE]);
        assert!(evs.is_empty());
    }

    #[test]
    fn denied_will_replies_dont() {
        let mut session = Session::new(Flags::default(), None);
        let evs = events(&mut session, &[IAC, WILL, option::ECHO]);
        assert!(matches!(evs[0], Event::Will(NegotiationRequest { accept: false, .. })));
        assert_eq!(evs[1], Event::Send(vec![IAC, DONT, option::ECHO]));
    }

    #[test]
    fn subnegotiation_body_unescapes_doubled_iac() {
        let mut session = Session::new(Flags::default(), None);
        let mut wire = vec![IAC, SB, option::ZMP];
        wire.extend_from_slice(b"pkg");
        wire.push(IAC);
        wire.push(IAC); // escaped 0xFF inside the body
        wire.push(IAC);
        wire.push(SE);
        let evs = events(&mut session, &wire);
        let sub = evs
            .iter()
            .find_map(|e| match e {
                Event::Subnegotiation(sub) => Some(sub),
                _ => None,
            })
            .expect("a Subnegotiation event");
        let mut expected = b"pkg".to_vec();
        expected.push(IAC);
        assert_eq!(sub.body, expected);
    }

    #[test]
    fn data_escape_round_trips_through_send_and_receive() {
        let mut session = Session::new(Flags::default(), None);
        let mut sink = VecSink::default();
        session.send_data(&[1, 2, IAC, 3], &mut sink);
        let wire = match &sink.0[0] {
            Event::Send(bytes) => bytes.clone(),
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(wire, vec![1, 2, IAC, IAC, 3]);

        let mut receiver = Session::new(Flags::default(), None);
        let evs = events(&mut receiver, &wire);
        assert_eq!(evs, vec![Event::Data(vec![1, 2, IAC, 3])]);
    }

    #[test]
    fn mccp2_begins_mid_chunk_and_splices_the_rest_as_compressed() {
        let policy = PolicyTable::new().allow_remote(option::MCCP2);
        let mut session = Session::new(Flags::default(), Some(policy));

        let mut sink = VecSink::default();
        session.recv(&mut sink, &[IAC, WILL, option::MCCP2]);
        assert!(session.is_compressing_inbound() == false);

        // A sync-flushed (not finished) stream, the way a live MCCP2 session
        // keeps flushing without ever terminating the deflate stream.
        let mut deflator = Deflator::new();
        let mut compressed = Vec::new();
        deflator.deflate(b"post-compress payload", &mut compressed).unwrap();

        let mut chunk = vec![IAC, SB, option::MCCP2, IAC, SE];
        chunk.extend_from_slice(&compressed);

        let mut sink = VecSink::default();
        session.recv(&mut sink, &chunk);
        assert!(session.is_compressing_inbound());
        assert!(sink.0.iter().any(|e| matches!(e, Event::Compress(true))));
        assert!(sink.0.iter().any(|e| matches!(e, Event::Data(d) if d == b"post-compress payload")));
    }

    #[test]
    fn mccp2_stream_end_tears_down_compression_and_resumes_plaintext() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let policy = PolicyTable::new().allow_remote(option::MCCP2);
        let mut session = Session::new(Flags::default(), Some(policy));
        session.recv(&mut VecSink::default(), &[IAC, WILL, option::MCCP2]);

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"last compressed words").unwrap();
        let finished = encoder.finish().unwrap();

        let mut chunk = vec![IAC, SB, option::MCCP2, IAC, SE];
        chunk.extend_from_slice(&finished);
        chunk.extend_from_slice(b"plaintext again");

        let mut sink = VecSink::default();
        session.recv(&mut sink, &chunk);
        assert!(!session.is_compressing_inbound());
        assert!(sink.0.iter().any(|e| matches!(e, Event::Compress(false))));
        // The decompressed tail and the plaintext that follows the stream's
        // end aren't separated by an IAC, so they land in a single Data run.
        assert!(sink.0.iter().any(|e| matches!(e, Event::Data(d) if d == b"last compressed wordsplaintext again")));
    }

    #[test]
    fn malformed_subnegotiation_tail_recovers_to_data_state() {
        let mut session = Session::new(Flags::default(), None);
        // IAC SB ZMP <body> IAC <garbage, not SE> then plain data. The
        // garbage byte is re-dispatched as if it had just followed a fresh
        // IAC, so it surfaces as Event::Iac rather than being swallowed.
        let wire = vec![IAC, SB, option::ZMP, b'x', IAC, b'z', b'o', b'k'];
        let evs = events(&mut session, &wire);
        assert!(evs.iter().any(|e| matches!(e, Event::Warning(ErrorCode::EProtocol, _))));
        assert!(evs.iter().any(|e| matches!(e, Event::Iac(b'z'))));
        assert!(evs.iter().any(|e| matches!(e, Event::Data(d) if d == b"ok")));
    }

    #[test]
    fn subnegotiation_overflow_emits_eoverflow_and_recovers() {
        let mut session = Session::new(Flags::default(), None);
        let mut wire = vec![IAC, SB, option::ZMP];
        wire.extend(std::iter::repeat(b'a').take(20_000));
        wire.push(IAC);
        wire.push(SE);
        wire.extend_from_slice(b"ok");
        let evs = events(&mut session, &wire);
        assert!(evs.iter().any(|e| matches!(e, Event::Warning(ErrorCode::EOverflow, _))));
        assert!(evs.iter().any(|e| matches!(e, Event::Data(d) if d == b"ok")));
    }

    #[test]
    fn proxy_mode_emits_the_event_without_auto_replying() {
        let mut session = Session::new(Flags { proxy: true }, None);
        let evs = events(&mut session, &[IAC, WILL, option::ECHO]);
        assert!(matches!(evs[0], Event::Will(NegotiationRequest { telopt, .. }) if telopt == option::ECHO));
        assert!(!evs.iter().any(|e| matches!(e, Event::Send(_))));
    }

    #[test]
    fn printf_translates_line_endings_and_doubles_iac() {
        let mut session = Session::new(Flags::default(), None);
        let mut sink = VecSink::default();
        session.printf("a\r\nb\u{FF}", &mut sink);
        let wire = match &sink.0[0] {
            Event::Send(bytes) => bytes.clone(),
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(wire, vec![b'a', b'\r', 0, b'\r', b'\n', b'b', 0xFF, 0xFF]);
    }

    #[test]
    fn raw_printf_sends_unchanged_through_send_data() {
        let mut session = Session::new(Flags::default(), None);
        let mut sink = VecSink::default();
        session.raw_printf("a\nb", &mut sink);
        assert_eq!(sink.0, vec![Event::Send(b"a\nb".to_vec())]);
    }

    #[test]
    fn send_negotiate_dispatches_to_the_matching_request() {
        let mut session = Session::new(Flags::default(), None);
        let mut sink = VecSink::default();
        session.send_negotiate(WILL, option::TTYPE, &mut sink);
        assert_eq!(sink.0, vec![Event::Send(vec![IAC, WILL, option::TTYPE])]);
    }

    #[test]
    fn format_sb_frames_tag_prefixed_pairs_without_nul_terminators() {
        let mut session = Session::new(Flags::default(), None);
        let mut sink = VecSink::default();
        session.format_sb(option::MSSP, &[(1, "PLAYERS"), (2, "12")], &mut sink);
        let wire = match &sink.0[0] {
            Event::Send(bytes) => bytes.clone(),
            other => panic!("unexpected event {other:?}"),
        };
        let mut expected = vec![IAC, SB, option::MSSP, 1];
        expected.extend_from_slice(b"PLAYERS");
        expected.push(2);
        expected.extend_from_slice(b"12");
        expected.push(IAC);
        expected.push(SE);
        assert_eq!(wire, expected);
    }

    #[test]
    fn begin_compress2_emits_the_activation_marker_then_compresses() {
        let mut session = Session::new(Flags::default(), None);
        let mut sink = VecSink::default();
        session.begin_compress2(&mut sink);
        assert_eq!(sink.0[0], Event::Send(vec![IAC, SB, option::MCCP2, IAC, SE]));
        assert!(matches!(sink.0[1], Event::Compress(true)));
        assert!(session.is_compressing_outbound());

        let mut sink = VecSink::default();
        session.begin_compress2(&mut sink);
        assert!(matches!(sink.0[0], Event::Warning(ErrorCode::EBadVal, _)));
    }

    #[test]
    fn proxy_subnegotiation_of_mccp2_starts_deflating_after_the_se() {
        let mut session = Session::new(Flags { proxy: true }, None);
        let mut sink = VecSink::default();
        session.subnegotiation(option::MCCP2, &[], &mut sink);
        assert!(session.is_compressing_outbound());
        assert!(sink.0.iter().any(|e| matches!(e, Event::Compress(true))));
    }

    #[test]
    fn close_is_idempotent_and_tears_down_compression_and_receive_state() {
        let mut session = Session::new(Flags::default(), None);
        let mut sink = VecSink::default();
        session.begin_compress2(&mut sink);
        assert!(session.is_compressing_outbound());

        session.close();
        assert!(!session.is_compressing_outbound());
        assert!(!session.is_compressing_inbound());

        // Idempotent: closing an already-closed session is a no-op.
        session.close();
        assert!(!session.is_compressing_outbound());
    }
}
