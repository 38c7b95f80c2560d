//! RFC 1143 "Q Method" option negotiation state machine.
//!
//! Generalizes `tf::telnet::NegotiationState` (a donor-simplified 4-state,
//! single-pending-request model good enough for a client that only ever
//! negotiates a handful of options it already knows it wants) up to the full
//! six-state Q-Method the donor's own module doc admits it's missing:
//! "I'm skeptical of this logic. It seems like something closer to RFC 1143
//! and the Q Method would be more appropriate."

/// One side's (local `us` or remote `him`) negotiation state for a telopt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QState {
    No,
    Yes,
    WantNo,
    WantYes,
    /// `WantNo` with an opposite (enable) request queued behind it.
    WantNoOp,
    /// `WantYes` with an opposite (disable) request queued behind it.
    WantYesOp,
}

impl Default for QState {
    fn default() -> Self {
        QState::No
    }
}

/// Both sides' state for a single telopt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Entry {
    pub us: QState,
    pub him: QState,
}

/// Which side a state transition is being applied to, purely to pick the
/// right diagnostic text — the transition table itself is identical for
/// both sides (the distilled spec marks the DO/DONT columns "symmetric"
/// with WILL/WONT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// `him`, driven by WILL/WONT.
    Him,
    /// `us`, driven by DO/DONT.
    Us,
}

/// What to send in response to a wire-level negotiation, in side-neutral
/// terms. The caller maps `Positive`/`Negative` to WILL/DO or WONT/DONT
/// depending on [`Side`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

/// The result of processing one inbound WILL/WONT/DO/DONT against a side's
/// current state.
#[derive(Debug, Clone, Copy)]
pub struct RecvOutcome {
    pub new_state: QState,
    pub emit_event: bool,
    pub send: Option<Polarity>,
    pub warning: Option<&'static str>,
}

/// Process an inbound "enable" command (WILL for `him`, DO for `us`).
///
/// `accept` is only consulted in the `No` state, where the caller must
/// already have resolved host policy and given the sink a chance to
/// override it before calling this function.
pub fn recv_enable(state: QState, side: Side, accept: bool) -> RecvOutcome {
    let warn_unexpected = match side {
        Side::Him => "DONT answered by WILL",
        Side::Us => "WONT answered by DO",
    };
    match state {
        QState::No => {
            if accept {
                RecvOutcome { new_state: QState::Yes, emit_event: true, send: Some(Polarity::Positive), warning: None }
            } else {
                RecvOutcome { new_state: QState::No, emit_event: true, send: Some(Polarity::Negative), warning: None }
            }
        }
        QState::Yes => {
            // Duplicate advertisement: collapse to nothing on the wire.
            RecvOutcome { new_state: QState::Yes, emit_event: false, send: None, warning: None }
        }
        QState::WantNo => RecvOutcome {
            new_state: QState::No,
            emit_event: true,
            send: None,
            warning: Some(warn_unexpected),
        },
        QState::WantNoOp => RecvOutcome {
            new_state: QState::Yes,
            emit_event: true,
            send: None,
            warning: Some(warn_unexpected),
        },
        QState::WantYes => RecvOutcome { new_state: QState::Yes, emit_event: true, send: None, warning: None },
        QState::WantYesOp => RecvOutcome {
            new_state: QState::WantNo,
            emit_event: true,
            send: Some(Polarity::Negative),
            warning: None,
        },
    }
}

/// Process an inbound "disable" command (WONT for `him`, DONT for `us`).
pub fn recv_disable(state: QState) -> RecvOutcome {
    match state {
        QState::No => RecvOutcome { new_state: QState::No, emit_event: false, send: None, warning: None },
        QState::Yes => RecvOutcome {
            new_state: QState::No,
            emit_event: true,
            send: Some(Polarity::Negative),
            warning: None,
        },
        QState::WantNo => RecvOutcome { new_state: QState::No, emit_event: true, send: None, warning: None },
        QState::WantNoOp => RecvOutcome {
            new_state: QState::WantYes,
            emit_event: true,
            send: Some(Polarity::Positive),
            warning: None,
        },
        QState::WantYes => RecvOutcome { new_state: QState::No, emit_event: false, send: None, warning: None },
        QState::WantYesOp => RecvOutcome { new_state: QState::No, emit_event: false, send: None, warning: None },
    }
}

/// Outcome of a host-initiated request to enable or disable an option:
/// the side's new state, and whether a wire command must be sent now
/// (`false` means the request was queued behind one already in flight).
#[derive(Debug, Clone, Copy)]
pub struct RequestOutcome {
    pub new_state: QState,
    pub send: bool,
}

/// The host asks to enable this side (send WILL for `us`, DO for `him`).
pub fn request_enable(state: QState) -> RequestOutcome {
    match state {
        QState::No => RequestOutcome { new_state: QState::WantYes, send: true },
        QState::Yes => RequestOutcome { new_state: QState::Yes, send: false },
        QState::WantNo => RequestOutcome { new_state: QState::WantNoOp, send: false },
        QState::WantNoOp => RequestOutcome { new_state: QState::WantNoOp, send: false },
        QState::WantYes => RequestOutcome { new_state: QState::WantYes, send: false },
        QState::WantYesOp => RequestOutcome { new_state: QState::WantYes, send: false },
    }
}

/// The host asks to disable this side (send WONT for `us`, DONT for `him`).
pub fn request_disable(state: QState) -> RequestOutcome {
    match state {
        QState::No => RequestOutcome { new_state: QState::No, send: false },
        QState::Yes => RequestOutcome { new_state: QState::WantNo, send: true },
        QState::WantNo => RequestOutcome { new_state: QState::WantNo, send: false },
        QState::WantNoOp => RequestOutcome { new_state: QState::WantNo, send: false },
        QState::WantYes => RequestOutcome { new_state: QState::WantYesOp, send: false },
        QState::WantYesOp => RequestOutcome { new_state: QState::WantYesOp, send: false },
    }
}

const TABLE_SIZE: usize = 1 + u8::MAX as usize;

/// Per-telopt Q-Method state for an entire session.
///
/// A fixed 256-entry array, mirroring the donor's `[bool; 256]` per-option
/// arrays in `NegotiationState` rather than a `HashMap`.
pub struct QTable {
    entries: Box<[Entry; TABLE_SIZE]>,
}

impl QTable {
    pub fn new() -> Self {
        Self { entries: Box::new([Entry::default(); TABLE_SIZE]) }
    }

    pub fn entry(&self, telopt: u8) -> Entry {
        self.entries[telopt as usize]
    }

    pub fn set(&mut self, telopt: u8, entry: Entry) {
        self.entries[telopt as usize] = entry;
    }
}

impl Default for QTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Host policy for a telopt: whether the local side may advertise `WILL`,
/// and whether the remote side may be asked `DO`. Telopts absent from the
/// table (the default `Policy`) refuse both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub allow_will: bool,
    pub allow_do: bool,
}

/// A sparse, fixed-size table of per-telopt [`Policy`] entries.
///
/// Corresponds to the `Table::from(supported_iter)` builder pattern in
/// `tf::net::telnet::negotiation`, generalized to distinguish local from
/// remote permission per the distilled spec's policy model.
pub struct PolicyTable {
    entries: Box<[Policy; TABLE_SIZE]>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self { entries: Box::new([Policy::default(); TABLE_SIZE]) }
    }

    #[must_use]
    pub fn allow_local(mut self, telopt: u8) -> Self {
        self.entries[telopt as usize].allow_will = true;
        self
    }

    #[must_use]
    pub fn allow_remote(mut self, telopt: u8) -> Self {
        self.entries[telopt as usize].allow_do = true;
        self
    }

    pub fn policy(&self, telopt: u8) -> Policy {
        self.entries[telopt as usize]
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_state_accept_grants_and_replies_positive() {
        let outcome = recv_enable(QState::No, Side::Him, true);
        assert_eq!(outcome.new_state, QState::Yes);
        assert!(outcome.emit_event);
        assert_eq!(outcome.send, Some(Polarity::Positive));
    }

    #[test]
    fn no_state_deny_refuses_and_replies_negative() {
        let outcome = recv_enable(QState::No, Side::Him, false);
        assert_eq!(outcome.new_state, QState::No);
        assert_eq!(outcome.send, Some(Polarity::Negative));
    }

    #[test]
    fn yes_state_duplicate_will_is_silently_ignored() {
        let outcome = recv_enable(QState::Yes, Side::Him, true);
        assert_eq!(outcome.new_state, QState::Yes);
        assert!(!outcome.emit_event);
        assert!(outcome.send.is_none());
    }

    #[test]
    fn yes_state_disable_transitions_to_no_and_replies() {
        let outcome = recv_disable(QState::Yes);
        assert_eq!(outcome.new_state, QState::No);
        assert_eq!(outcome.send, Some(Polarity::Negative));
    }

    #[test]
    fn wantno_unexpected_enable_warns_and_resets_to_no() {
        let outcome = recv_enable(QState::WantNo, Side::Him, true);
        assert_eq!(outcome.new_state, QState::No);
        assert_eq!(outcome.warning, Some("DONT answered by WILL"));

        let outcome = recv_enable(QState::WantNo, Side::Us, true);
        assert_eq!(outcome.warning, Some("WONT answered by DO"));
    }

    #[test]
    fn wantnoop_unexpected_enable_moves_to_yes() {
        let outcome = recv_enable(QState::WantNoOp, Side::Him, true);
        assert_eq!(outcome.new_state, QState::Yes);
        assert!(outcome.warning.is_some());
    }

    #[test]
    fn wantnoop_disable_resolves_and_sends_queued_enable() {
        let outcome = recv_disable(QState::WantNoOp);
        assert_eq!(outcome.new_state, QState::WantYes);
        assert_eq!(outcome.send, Some(Polarity::Positive));
    }

    #[test]
    fn wantyesop_enable_resolves_and_sends_queued_disable() {
        let outcome = recv_enable(QState::WantYesOp, Side::Him, true);
        assert_eq!(outcome.new_state, QState::WantNo);
        assert_eq!(outcome.send, Some(Polarity::Negative));
    }

    #[test]
    fn request_enable_from_no_sends_and_moves_to_wantyes() {
        let outcome = request_enable(QState::No);
        assert_eq!(outcome.new_state, QState::WantYes);
        assert!(outcome.send);
    }

    #[test]
    fn request_enable_from_yes_is_a_no_op() {
        let outcome = request_enable(QState::Yes);
        assert_eq!(outcome.new_state, QState::Yes);
        assert!(!outcome.send);
    }

    #[test]
    fn opposite_request_while_pending_is_queued_not_sent() {
        let outcome = request_enable(QState::WantNo);
        assert_eq!(outcome.new_state, QState::WantNoOp);
        assert!(!outcome.send);

        let outcome = request_disable(QState::WantYes);
        assert_eq!(outcome.new_state, QState::WantYesOp);
        assert!(!outcome.send);
    }

    #[test]
    fn policy_table_defaults_to_deny() {
        let table = PolicyTable::new();
        let policy = table.policy(24);
        assert!(!policy.allow_will);
        assert!(!policy.allow_do);
    }

    #[test]
    fn policy_table_builder_allows_listed_telopts() {
        let table = PolicyTable::new().allow_local(24).allow_remote(31);
        assert!(table.policy(24).allow_will);
        assert!(!table.policy(24).allow_do);
        assert!(table.policy(31).allow_do);
    }
}
