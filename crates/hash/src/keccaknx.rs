//! Lane-array absorption.
//!
//! A batched kernel keeps many independent permutation states side by side
//! and advances every live one by exactly one block per launch. Each state
//! reads its block from its own fixed-size slot of a shared staging buffer;
//! a [`LaneMask`] says which states take part.

use alloc::{boxed::Box, vec};

use crate::{PLEN, keccak_f1600, xor_block};

/// Fixed-capacity liveness bitset over lane slots.
#[derive(Clone, PartialEq, Eq)]
pub struct LaneMask {
    words: Box<[u64]>,
    capacity: usize,
}

impl LaneMask {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0u64; capacity.div_ceil(64)].into_boxed_slice(),
            capacity,
        }
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn set(&mut self, lane: usize) {
        debug_assert!(lane < self.capacity);
        self.words[lane / 64] |= 1u64 << (lane % 64);
    }

    #[inline]
    pub fn clear(&mut self, lane: usize) {
        debug_assert!(lane < self.capacity);
        self.words[lane / 64] &= !(1u64 << (lane % 64));
    }

    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, lane: usize) -> bool {
        lane < self.capacity && self.words[lane / 64] & (1u64 << (lane % 64)) != 0
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Set lanes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            core::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * 64 + bit)
            })
        })
    }
}

impl core::fmt::Debug for LaneMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Absorb one rate-sized block from `slot` into `state`.
#[inline]
pub fn absorb_lane(state: &mut [u64; PLEN], slot: &[u8], rate: usize) {
    xor_block(state, &slot[..rate]);
    keccak_f1600(state);
}
