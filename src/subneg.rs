//! Decoding and encoding of structured `IAC SB` bodies.
//!
//! Grounded on `tf::net::Protocol::handle_subneg`, which splits a GMCP/ATCP
//! body on the first space into a package name and a JSON argument. The
//! telopts this engine has to understand are each tag-prefixed rather than
//! space-delimited, so each gets its own small decoder below, but the shape
//! — turn an opaque body into a structured argument list, falling back to
//! the raw bytes when the framing doesn't hold up — is the donor's.

use crate::telopt::{option, ESC, IS, SEND};

/// ENVIRON/NEW-ENVIRON/MSSP segment tags. ENVIRON and NEW-ENVIRON share
/// VAR/VALUE/ESC/USERVAR; MSSP reuses the numbering space with its own
/// VAR/VAL pair. Decoding accepts either so a single routine covers both.
mod tag {
    pub const VAR: u8 = 0;
    pub const VALUE: u8 = 1;
    pub const ESC: u8 = 2;
    pub const USERVAR: u8 = 3;
    pub const MSSP_VAR: u8 = 1;
    pub const MSSP_VAL: u8 = 2;
}

/// Splits a ZMP body into its NUL-delimited argv.
///
/// A ZMP frame is `pkg.command\0arg1\0arg2\0...\0`: every argument,
/// including the last, is NUL-terminated. A body that is empty or doesn't
/// end in a NUL is an incomplete frame, not a zero-argument one.
pub fn decode_zmp(body: &[u8]) -> Option<Vec<Vec<u8>>> {
    if body.last().copied() != Some(0) {
        return None;
    }
    let mut argv: Vec<Vec<u8>> = body.split(|&b| b == 0).map(|s| s.to_vec()).collect();
    argv.pop(); // the trailing empty element produced by the final NUL
    Some(argv)
}

/// Encodes argv into a ZMP body, NUL-terminating every argument.
pub fn encode_zmp(argv: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    for arg in argv {
        body.extend_from_slice(arg);
        body.push(0);
    }
    body
}

/// Decodes a TTYPE body. `IS <name>` yields a one-element argv; `SEND`
/// yields an empty argv (a request, carrying no value).
pub fn decode_ttype(body: &[u8]) -> Option<Vec<Vec<u8>>> {
    match body.first().copied() {
        Some(IS) => Some(vec![body[1..].to_vec()]),
        Some(SEND) => Some(vec![]),
        _ => None,
    }
}

/// Decodes an ENVIRON/NEW-ENVIRON body's `IS`/`SEND` payload into a flat
/// argv of alternating name/value segments (`USERVAR` is folded in as a
/// name like `VAR`). The literal `ESC` byte (tag value 2) is left
/// unescaped in both directions.
pub fn decode_environ(body: &[u8]) -> Option<Vec<Vec<u8>>> {
    let (_cmd, rest) = match body.first().copied() {
        Some(IS) | Some(SEND) => (body[0], &body[1..]),
        _ => return None,
    };
    Some(split_tagged(rest, &[tag::VAR, tag::VALUE, tag::USERVAR], Some(tag::ESC)))
}

/// Decodes an MSSP body into a flat argv of alternating var/value segments.
/// MSSP has no ESC byte of its own — `tag::MSSP_VAL` happens to share
/// ENVIRON's ESC value, so escaping must stay off here or a VAL tag gets
/// swallowed as if it were an escape.
pub fn decode_mssp(body: &[u8]) -> Option<Vec<Vec<u8>>> {
    if body.is_empty() {
        return None;
    }
    Some(split_tagged(body, &[tag::MSSP_VAR, tag::MSSP_VAL], None))
}

/// Splits `body` at every byte in `tags`, treating `esc` (when present) as
/// escaping the following byte literally rather than as a tag. Each
/// resulting segment (the bytes strictly between two tag bytes) becomes one
/// argv element; leading tag bytes delimit but do not themselves appear in
/// the output.
fn split_tagged(body: &[u8], tags: &[u8], esc: Option<u8>) -> Vec<Vec<u8>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut started = false;
    let mut i = 0;
    while i < body.len() {
        let b = body[i];
        if esc == Some(b) && i + 1 < body.len() {
            current.push(body[i + 1]);
            i += 2;
            continue;
        }
        if tags.contains(&b) {
            if started {
                segments.push(std::mem::take(&mut current));
            }
            started = true;
        } else {
            current.push(b);
        }
        i += 1;
    }
    if started {
        segments.push(current);
    }
    segments
}

/// Dispatches to the right decoder for a recognized telopt, returning
/// `None` for anything this engine doesn't structurally understand — the
/// caller falls back to delivering the raw body.
pub fn decode(telopt: u8, body: &[u8]) -> Option<Vec<Vec<u8>>> {
    match telopt {
        option::ZMP => decode_zmp(body),
        option::TTYPE => decode_ttype(body),
        option::ENVIRON | option::NEW_ENVIRON => decode_environ(body),
        option::MSSP => decode_mssp(body),
        _ => None,
    }
}
