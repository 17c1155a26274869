//! Sequential streaming SHA3.
//!
//! The reference engine: every other engine must reproduce its output
//! bit-for-bit for the same input.

use zeroize::Zeroize;

use crate::{Digest, DigestWidth, HashError, MAX_RATE, Sponge};

/// Streaming SHA3 hasher: `Fresh -> Absorbing -> Finalized`.
///
/// Data may arrive in chunks of any size; bytes that do not fill a whole
/// rate block wait in a short buffer until the next call or [`digest`].
///
/// [`digest`]: Self::digest
#[derive(Clone)]
pub struct Sha3 {
    sponge: Sponge,
    buffer: [u8; MAX_RATE],
    buffered: usize,
    finished: bool,
}

impl Sha3 {
    #[must_use]
    pub const fn new(width: DigestWidth) -> Self {
        Self {
            sponge: Sponge::new(width),
            buffer: [0; MAX_RATE],
            buffered: 0,
            finished: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> DigestWidth {
        self.sponge.width()
    }

    /// Start a new message, discarding any absorbed data.
    pub fn init(&mut self) {
        self.sponge.reset();
        self.buffer.zeroize();
        self.buffered = 0;
        self.finished = false;
    }

    /// Absorb `data`.
    pub fn add(&mut self, mut data: &[u8]) -> Result<(), HashError> {
        if self.finished {
            return Err(HashError::Finalized);
        }
        let rate = self.sponge.rate();

        if self.buffered > 0 {
            let n = (rate - self.buffered).min(data.len());
            self.buffer[self.buffered..self.buffered + n].copy_from_slice(&data[..n]);
            self.buffered += n;
            data = &data[n..];
            if self.buffered < rate {
                return Ok(());
            }
            self.sponge.absorb_block(&self.buffer[..rate]);
            self.buffered = 0;
        }

        let mut blocks = data.chunks_exact(rate);
        for block in &mut blocks {
            self.sponge.absorb_block(block);
        }
        let tail = blocks.remainder();
        self.buffer[..tail.len()].copy_from_slice(tail);
        self.buffered = tail.len();
        Ok(())
    }

    /// Pad, absorb the final block and return the digest.
    pub fn digest(&mut self) -> Result<Digest, HashError> {
        if self.finished {
            return Err(HashError::Finalized);
        }
        let mut out = Digest::zeroed(self.width());
        self.sponge.finish(&self.buffer[..self.buffered], out.as_mut_bytes());
        self.buffer.zeroize();
        self.buffered = 0;
        self.finished = true;
        Ok(out)
    }
}

impl Drop for Sha3 {
    fn drop(&mut self) {
        self.buffer.zeroize();
    }
}

impl core::fmt::Debug for Sha3 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sha3")
            .field("width", &self.width())
            .field("buffered", &self.buffered)
            .field("finished", &self.finished)
            .finish()
    }
}

/// One-shot SHA3 of `data`.
#[must_use]
pub fn sha3(width: DigestWidth, data: impl AsRef<[u8]>) -> Digest {
    let mut sponge = Sponge::new(width);
    let data = data.as_ref();
    let rate = width.rate();
    let mut blocks = data.chunks_exact(rate);
    for block in &mut blocks {
        sponge.absorb_block(block);
    }
    let mut out = Digest::zeroed(width);
    sponge.finish(blocks.remainder(), out.as_mut_bytes());
    out
}
