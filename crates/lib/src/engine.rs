//! Engine-agnostic interfaces used by the tools and benchmarks.

use lanes_hash::{Digest, DigestWidth, Sha3};

use crate::Error;

/// Incremental hashing of one message at a time.
pub trait StreamingHasher {
    fn width(&self) -> DigestWidth;

    /// Start a new message.
    fn init(&mut self) -> Result<(), Error>;

    fn add(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Finalize the current message.
    fn digest(&mut self) -> Result<Digest, Error>;
}

/// Hashing of many independent messages per call.
pub trait BatchHasher {
    fn width(&self) -> DigestWidth;

    /// Number of messages the engine processes at once.
    fn batch_size(&self) -> usize;

    /// Digests in input order.
    fn calculate<M>(&mut self, messages: &[M]) -> Result<Vec<Digest>, Error>
    where
        M: AsRef<[u8]> + Sync;
}

impl StreamingHasher for Sha3 {
    fn width(&self) -> DigestWidth {
        Self::width(self)
    }

    fn init(&mut self) -> Result<(), Error> {
        Self::init(self);
        Ok(())
    }

    fn add(&mut self, data: &[u8]) -> Result<(), Error> {
        Ok(Self::add(self, data)?)
    }

    fn digest(&mut self) -> Result<Digest, Error> {
        Ok(Self::digest(self)?)
    }
}

/// Round `requested` down to a whole number of `native` batches, but never
/// below one batch.
#[must_use]
pub const fn corrected_batch_size(requested: usize, native: usize) -> usize {
    if native == 0 {
        return requested;
    }
    let rounded = requested / native * native;
    if rounded < native { native } else { rounded }
}
