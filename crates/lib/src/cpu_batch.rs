//! Batch API over host threads: each message is hashed whole by the
//! sequential engine, messages in parallel on the `rayon` pool.

use lanes_hash::{Digest, DigestWidth, sha3};
use rayon::prelude::*;
use tracing::debug_span;

use crate::{Error, engine::BatchHasher};

#[derive(Clone, Copy, Debug)]
pub struct Sha3CpuBatch {
    width: DigestWidth,
}

impl Sha3CpuBatch {
    #[must_use]
    pub const fn new(width: DigestWidth) -> Self {
        Self { width }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> DigestWidth {
        self.width
    }

    /// Threads in the current pool.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        rayon::current_num_threads()
    }

    #[must_use]
    pub fn calculate<M: AsRef<[u8]> + Sync>(&self, messages: &[M]) -> Vec<Digest> {
        let _span =
            debug_span!("cpu_calculate", width = %self.width, messages = messages.len()).entered();
        messages.par_iter().map(|m| sha3(self.width, m)).collect()
    }

    pub fn calculate_into<M: AsRef<[u8]> + Sync>(
        &self, messages: &[M], out: &mut [Digest],
    ) -> Result<(), Error> {
        if messages.len() != out.len() {
            return Err(Error::LengthMismatch {
                expected: messages.len(),
                actual: out.len(),
            });
        }
        out.par_iter_mut()
            .zip(messages.par_iter())
            .for_each(|(slot, m)| *slot = sha3(self.width, m));
        Ok(())
    }
}

impl BatchHasher for Sha3CpuBatch {
    fn width(&self) -> DigestWidth {
        self.width
    }

    fn batch_size(&self) -> usize {
        Self::batch_size(self)
    }

    fn calculate<M>(&mut self, messages: &[M]) -> Result<Vec<Digest>, Error>
    where
        M: AsRef<[u8]> + Sync,
    {
        Ok(Self::calculate(self, messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_sequential_in_order() {
        let batch = Sha3CpuBatch::new(DigestWidth::Sha3_384);
        let messages: Vec<Vec<u8>> = (0..40).map(|n| vec![n as u8; n * 13]).collect();
        let got = batch.calculate(&messages);
        for (m, d) in messages.iter().zip(&got) {
            assert_eq!(d, &sha3(DigestWidth::Sha3_384, m));
        }

        let mut out = vec![Digest::zeroed(DigestWidth::Sha3_384); messages.len()];
        batch.calculate_into(&messages, &mut out).unwrap();
        assert_eq!(out, got);
        assert!(batch.calculate_into(&messages, &mut out[1..]).is_err());
    }
}
