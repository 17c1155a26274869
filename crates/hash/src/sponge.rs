//! Sponge absorb / pad / squeeze around [`keccak_f1600`].

use zeroize::Zeroize;

use crate::{DigestWidth, PAD_END, PLEN, SHA3_PAD, STATE_BYTES, keccak_f1600};

/// XOR `block` into the leading lanes of `state`.
///
/// `block.len()` must be a multiple of 8 and at most the state size.
#[inline]
pub fn xor_block(state: &mut [u64; PLEN], block: &[u8]) {
    debug_assert!(block.len().is_multiple_of(8));
    debug_assert!(block.len() <= STATE_BYTES);
    for (b, s) in block.chunks_exact(8).zip(state.iter_mut()) {
        *s ^= u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
    }
}

/// Build the final padded block for a message tail shorter than `rate`.
///
/// Only the first `rate` bytes of the returned buffer are meaningful. When a
/// single byte of room is left the domain byte and the end bit share it.
#[must_use]
pub fn pad_block(tail: &[u8], rate: usize) -> [u8; STATE_BYTES] {
    debug_assert!(tail.len() < rate);
    let mut block = [0u8; STATE_BYTES];
    block[..tail.len()].copy_from_slice(tail);
    block[tail.len()] ^= SHA3_PAD;
    block[rate - 1] ^= PAD_END;
    block
}

/// Copy the first `out.len()` bytes of the serialized state into `out`.
#[inline]
pub fn squeeze(state: &[u64; PLEN], out: &mut [u8]) {
    debug_assert!(out.len() <= STATE_BYTES);
    for (chunk, word) in out.chunks_mut(8).zip(state.iter()) {
        let bytes = word.to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
}

/// A permutation state bound to one digest width.
#[derive(Clone)]
pub struct Sponge {
    state: [u64; PLEN],
    width: DigestWidth,
}

impl Sponge {
    #[must_use]
    pub const fn new(width: DigestWidth) -> Self {
        Self {
            state: [0; PLEN],
            width,
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> DigestWidth {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn rate(&self) -> usize {
        self.width.rate()
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> &[u64; PLEN] {
        &self.state
    }

    /// Return to the all-zero state.
    pub fn reset(&mut self) {
        self.state.zeroize();
    }

    /// Absorb exactly one rate-sized block.
    #[inline]
    pub fn absorb_block(&mut self, block: &[u8]) {
        debug_assert_eq!(block.len(), self.rate());
        xor_block(&mut self.state, block);
        keccak_f1600(&mut self.state);
    }

    /// Pad `tail`, absorb it and squeeze the digest into `out`.
    pub fn finish(&mut self, tail: &[u8], out: &mut [u8]) {
        let rate = self.rate();
        let mut last = pad_block(tail, rate);
        self.absorb_block(&last[..rate]);
        last.zeroize();
        squeeze(&self.state, &mut out[..self.width.output_len()]);
    }
}

impl Drop for Sponge {
    fn drop(&mut self) {
        self.state.zeroize();
    }
}

impl core::fmt::Debug for Sponge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sponge")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_spreads_over_block() {
        let rate = DigestWidth::Sha3_256.rate();
        let block = pad_block(b"abc", rate);
        assert_eq!(&block[..3], b"abc");
        assert_eq!(block[3], 0x06);
        assert!(block[4..rate - 1].iter().all(|&b| b == 0));
        assert_eq!(block[rate - 1], 0x80);
    }

    #[test]
    fn pad_collides_in_last_byte() {
        let rate = DigestWidth::Sha3_512.rate();
        let tail = [0xAA_u8; 71];
        let block = pad_block(&tail, rate);
        assert_eq!(block[rate - 1], 0x86);
        assert!(block[rate..].iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_tail_is_padding_only() {
        let rate = DigestWidth::Sha3_384.rate();
        let block = pad_block(&[], rate);
        assert_eq!(block[0], 0x06);
        assert_eq!(block[rate - 1], 0x80);
        assert_eq!(block.iter().filter(|&&b| b != 0).count(), 2);
    }

    #[test]
    fn squeeze_handles_partial_word() {
        let mut state = [0u64; PLEN];
        state[0] = 0x0706_0504_0302_0100;
        state[1] = 0x0F0E_0D0C_0B0A_0908;
        let mut out = [0u8; 12];
        squeeze(&state, &mut out);
        assert_eq!(out, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    }
}
