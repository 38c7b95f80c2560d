//! Wire-level TELNET command bytes and well-known option codes.
//!
//! Corresponds to the constant tables at the top of `socket.c`'s Rust
//! counterpart (`tf::telnet`), extended with the option codes needed for
//! TTYPE/ENVIRON/NEW-ENVIRON/MSSP/ZMP that the donor client never negotiated.

/// Interpret As Command — starts every Telnet command sequence.
pub const IAC: u8 = 255;
/// WILL — sender will enable the option.
pub const WILL: u8 = 251;
/// WONT — sender will not enable the option.
pub const WONT: u8 = 252;
/// DO — sender requests the receiver to enable the option.
pub const DO: u8 = 253;
/// DONT — sender requests the receiver to disable the option.
pub const DONT: u8 = 254;
/// Subnegotiation Begin.
pub const SB: u8 = 250;
/// Subnegotiation End.
pub const SE: u8 = 240;
/// Go Ahead — signals end-of-turn / prompt boundary.
pub const GA: u8 = 249;
/// End of Record — alternative prompt boundary used by some servers.
pub const EOR: u8 = 239;
/// No operation.
pub const NOP: u8 = 241;

/// Subnegotiation sub-command: the following bytes are the current value.
pub const IS: u8 = 0;
/// Subnegotiation sub-command: please send your value.
pub const SEND: u8 = 1;
/// ENVIRON/NEW-ENVIRON sub-command: the bytes that follow should be escaped literally.
pub const ESC: u8 = 2;

/// Well-known TELNET option numbers.
pub mod option {
    pub const BINARY: u8 = 0;
    pub const ECHO: u8 = 1;
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
    pub const STATUS: u8 = 5;
    pub const TTYPE: u8 = 24;
    pub const END_OF_RECORD: u8 = 25;
    pub const NAWS: u8 = 31;
    pub const LINEMODE: u8 = 34;
    pub const ENVIRON: u8 = 36;
    pub const AUTHENTICATION: u8 = 37;
    pub const ENCRYPT: u8 = 38;
    pub const NEW_ENVIRON: u8 = 39;
    pub const MSSP: u8 = 70;
    /// MUD Client Compression Protocol, version 2 (deflate).
    pub const MCCP2: u8 = 86;
    /// MUD Client Compression Protocol, version 3 (legacy).
    pub const MCCP3: u8 = 87;
    /// Zenith MUD Protocol.
    pub const ZMP: u8 = 93;
}
