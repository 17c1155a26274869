//! Fixed-capacity digest value with hex display.

use alloc::string::String;

use crate::{DigestWidth, PLEN, squeeze};

/// Largest digest in bytes (SHA3-512).
pub const MAX_DIGEST_BYTES: usize = 64;

/// A finished SHA3 digest.
///
/// Backed by a 64-byte array; [`AsRef<[u8]>`] exposes exactly
/// `width.output_len()` bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest {
    bytes: [u8; MAX_DIGEST_BYTES],
    width: DigestWidth,
}

impl Digest {
    /// Squeeze the digest out of a finished permutation state.
    #[must_use]
    pub fn from_state(width: DigestWidth, state: &[u64; PLEN]) -> Self {
        let mut out = Self::zeroed(width);
        squeeze(state, out.as_mut_bytes());
        out
    }

    /// An all-zero placeholder of the given width.
    #[must_use]
    pub const fn zeroed(width: DigestWidth) -> Self {
        Self {
            bytes: [0; MAX_DIGEST_BYTES],
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
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.width.output_len()]
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8] {
        let len = self.width.output_len();
        &mut self.bytes[..len]
    }

    /// Lower-case hex, two characters per byte, no prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl AsRef<[u8]> for Digest {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq<[u8]> for Digest {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl core::fmt::LowerHex for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut buf = [0u8; 2 * MAX_DIGEST_BYTES];
        let len = 2 * self.width.output_len();
        hex::encode_to_slice(self.as_bytes(), &mut buf[..len]).map_err(|_| core::fmt::Error)?;
        let text = core::str::from_utf8(&buf[..len]).map_err(|_| core::fmt::Error)?;
        f.write_str(text)
    }
}

impl core::fmt::Display for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::LowerHex::fmt(self, f)
    }
}

impl core::fmt::Debug for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Digest({}, {self:x})", self.width)
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn exposes_output_len_bytes() {
        let d = Digest::zeroed(DigestWidth::Sha3_224);
        assert_eq!(d.as_bytes().len(), 28);
    }

    #[test]
    fn hex_is_lower_case_without_prefix() {
        let mut d = Digest::zeroed(DigestWidth::Sha3_256);
        d.as_mut_bytes()[..2].copy_from_slice(&[0x0F, 0xA0]);
        let text = format!("{d}");
        assert_eq!(text.len(), 64);
        assert!(text.starts_with("0fa0"));
        assert_eq!(text, d.to_hex());
    }
}
