//! Keccak-f[1600] and the SHA3 sponge (FIPS 202).
//!
//! Everything here runs on the host and is shared by every engine: the
//! permutation, the rate/capacity split, pad10*1 with the SHA3 domain byte,
//! the streaming [`Sha3`] hasher that defines the reference output, and the
//! per-lane absorption step that batched kernels apply to many states at once.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

mod digest;
mod keccak1x;
mod keccaknx;
mod params;
mod permutation;
mod sponge;

pub use digest::{Digest, MAX_DIGEST_BYTES};
pub use keccak1x::{Sha3, sha3};
pub use keccaknx::{LaneMask, absorb_lane};
pub use params::DigestWidth;
pub use permutation::keccak_f1600;
pub use sponge::{Sponge, pad_block, squeeze, xor_block};

/// Number of 64-bit lanes in the permutation state.
pub const PLEN: usize = 25;

/// Size of the permutation state in bytes.
pub const STATE_BYTES: usize = PLEN * 8;

/// Largest rate of any supported width (SHA3-224).
pub const MAX_RATE: usize = 144;

/// SHA3 domain separator plus the first padding bit.
pub const SHA3_PAD: u8 = 0x06;

/// Final padding bit, placed in the last byte of the rate.
pub const PAD_END: u8 = 0x80;

/// Contract violations of the hashing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashError {
    /// Digest width other than 224, 256, 384 or 512 bits.
    UnsupportedWidth(usize),
    /// Data or a digest was requested after the session was finalized.
    Finalized,
}

impl core::fmt::Display for HashError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedWidth(bits) => {
                write!(f, "unsupported digest width: {bits} bits")
            }
            Self::Finalized => f.write_str("hash session already finalized"),
        }
    }
}

impl core::error::Error for HashError {}
