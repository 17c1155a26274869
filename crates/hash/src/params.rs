//! Digest widths and the rate/capacity split they imply.

use crate::{HashError, STATE_BYTES};

/// One of the four fixed-output SHA3 instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestWidth {
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl DigestWidth {
    pub const ALL: [Self; 4] = [Self::Sha3_224, Self::Sha3_256, Self::Sha3_384, Self::Sha3_512];

    /// Output size in bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            Self::Sha3_224 => 224,
            Self::Sha3_256 => 256,
            Self::Sha3_384 => 384,
            Self::Sha3_512 => 512,
        }
    }

    /// Output size in bytes.
    #[inline]
    #[must_use]
    pub const fn output_len(self) -> usize {
        self.bits() / 8
    }

    /// Capacity in bits (twice the output width).
    #[inline]
    #[must_use]
    pub const fn capacity_bits(self) -> usize {
        2 * self.bits()
    }

    /// Bytes absorbed per permutation.
    #[inline]
    #[must_use]
    pub const fn rate(self) -> usize {
        STATE_BYTES - self.capacity_bits() / 8
    }
}

impl TryFrom<usize> for DigestWidth {
    type Error = HashError;

    fn try_from(bits: usize) -> Result<Self, Self::Error> {
        match bits {
            224 => Ok(Self::Sha3_224),
            256 => Ok(Self::Sha3_256),
            384 => Ok(Self::Sha3_384),
            512 => Ok(Self::Sha3_512),
            other => Err(HashError::UnsupportedWidth(other)),
        }
    }
}

impl core::fmt::Display for DigestWidth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SHA3-{}", self.bits())
    }
}

const _: () = {
    macro_rules! check_width {
        ($w:expr, $rate:expr) => {
            assert!($w.rate() == $rate);
            assert!($w.rate() * 8 + $w.capacity_bits() == 1600);
            assert!($w.rate() % 8 == 0);
            assert!($w.rate() <= crate::MAX_RATE);
            assert!($w.output_len() < $w.rate());
        };
    }
    check_width!(DigestWidth::Sha3_224, 144);
    check_width!(DigestWidth::Sha3_256, 136);
    check_width!(DigestWidth::Sha3_384, 104);
    check_width!(DigestWidth::Sha3_512, 72);
};
