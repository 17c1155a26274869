//! Keccak-f[1600] over a 5x5 array of 64-bit lanes.
//!
//! Lane `(x, y)` lives at index `x + 5 * y`.

use crate::PLEN;

/// Apply the full 24-round permutation in place.
#[inline]
pub fn keccak_f1600(state: &mut [u64; PLEN]) {
    keccak::f1600(state);
}
