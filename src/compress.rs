//! MCCP2 zlib stream handling.
//!
//! Grounded on `tf::net::Protocol::mccp_decompress` (and its
//! `mccp_decompress_roundtrip` test), which wraps `flate2::Decompress` to
//! inflate a server's compressed stream. The donor is a client that never
//! compresses outbound traffic; this module adds the deflate half so the
//! same engine can sit on either end of a telnet connection.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::event::ErrorCode;

/// Inflates bytes received after `IAC SB MCCP2 IAC SE` was accepted.
pub struct Inflator {
    inner: Decompress,
}

impl Inflator {
    pub fn new() -> Self {
        Self { inner: Decompress::new(true) }
    }

    /// Inflates as much of `input` as decodes cleanly, appending plaintext to
    /// `out`. Returns the number of input bytes consumed — usually all of
    /// them, but a stream that ends mid-chunk leaves the remainder for the
    /// next call once more bytes have arrived — and whether the zlib stream
    /// itself has ended, in which case the caller must tear the inflator
    /// down and treat anything past the consumed count as plaintext again.
    pub fn inflate(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(usize, bool), ErrorCode> {
        let start_in = self.inner.total_in();
        let mut chunk = [0u8; 4096];
        let mut ended = false;
        loop {
            let consumed_so_far = (self.inner.total_in() - start_in) as usize;
            if consumed_so_far >= input.len() {
                break;
            }
            let before_out = self.inner.total_out();
            let status = self
                .inner
                .decompress(&input[consumed_so_far..], &mut chunk, FlushDecompress::None)
                .map_err(|_| ErrorCode::ECompress)?;
            let produced = (self.inner.total_out() - before_out) as usize;
            out.extend_from_slice(&chunk[..produced]);
            if status == Status::StreamEnd {
                ended = true;
                break;
            }
            if produced == 0 {
                break;
            }
        }
        Ok(((self.inner.total_in() - start_in) as usize, ended))
    }
}

/// Deflates outbound bytes after this engine has accepted `DO MCCP2` from a
/// peer and begun compressing in the send direction.
pub struct Deflator {
    inner: Compress,
}

impl Deflator {
    pub fn new() -> Self {
        Self { inner: Compress::new(Compression::default(), true) }
    }

    pub fn deflate(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), ErrorCode> {
        let before_out = self.inner.total_out();
        let mut chunk = vec![0u8; (input.len() + 64) * 2];
        self.inner
            .compress(input, &mut chunk, FlushCompress::Sync)
            .map_err(|_| ErrorCode::ECompress)?;
        let produced = (self.inner.total_out() - before_out) as usize;
        out.extend_from_slice(&chunk[..produced.min(chunk.len())]);
        Ok(())
    }
}
