//! Batched accelerator engine.
//!
//! Up to `C` messages are in flight at once, one per lane of a fixed arena.
//! Every iteration gathers one block per busy lane into a host staging
//! buffer, uploads it, and launches a single `absorb_lanes` kernel that
//! advances all of those lanes together. Lanes whose message just absorbed
//! its final block queue a download of their state and are handed the next
//! message from the backlog on the following iteration, so short messages
//! do not hold the lane array hostage to long ones.
//!
//! Sorting the input by descending length gives the best lane occupancy,
//! but any order yields the same digests in input order.

use lanes_device::{Device, DeviceBuffer, Download, StagingRing, Stream, kernel};
use lanes_hash::{Digest, DigestWidth, PLEN};
use tracing::{debug, debug_span, trace, warn};

use crate::{Error, engine::BatchHasher, lanes::LaneArena};

pub struct Sha3Batch {
    width: DigestWidth,
    arena: LaneArena,
    states: DeviceBuffer<[u64; PLEN]>,
    slots: DeviceBuffer<u8>,
    ring: StagingRing,
    stream: Stream,
    poisoned: bool,
}

impl Sha3Batch {
    /// Engine on the process-wide [`Device::shared`] accelerator.
    pub fn new(width: DigestWidth) -> Result<Self, Error> {
        Self::with_device(width, &Device::shared()?)
    }

    /// Engine on `device` with `device.config().batch_lanes` lanes.
    pub fn with_device(width: DigestWidth, device: &Device) -> Result<Self, Error> {
        let config = device.config();
        let lanes = config.batch_lanes;
        let slots_len = lanes * width.rate();

        let states = device.alloc::<[u64; PLEN]>(lanes)?;
        let slots = device.alloc::<u8>(slots_len)?;
        let stream = device.create_stream()?;
        let ring = StagingRing::new(config.staging_depth, slots_len);

        debug!(
            %width,
            ordinal = device.ordinal(),
            lanes,
            staging_depth = config.staging_depth,
            "batch engine ready"
        );
        Ok(Self {
            width,
            arena: LaneArena::new(lanes),
            states,
            slots,
            ring,
            stream,
            poisoned: false,
        })
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> DigestWidth {
        self.width
    }

    /// Lane capacity `C`.
    #[inline]
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.arena.capacity()
    }

    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Digest every message; results are in input order.
    pub fn calculate<M: AsRef<[u8]>>(&mut self, messages: &[M]) -> Result<Vec<Digest>, Error> {
        let mut out = vec![Digest::zeroed(self.width); messages.len()];
        self.calculate_into(messages, &mut out)?;
        Ok(out)
    }

    /// Digest every message into the matching slot of `out`.
    pub fn calculate_into<M: AsRef<[u8]>>(
        &mut self, messages: &[M], out: &mut [Digest],
    ) -> Result<(), Error> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        if messages.len() != out.len() {
            return Err(Error::LengthMismatch {
                expected: messages.len(),
                actual: out.len(),
            });
        }
        if messages.is_empty() {
            return Ok(());
        }

        let _span = debug_span!("calculate", width = %self.width, messages = messages.len())
            .entered();
        let result = self.run(messages, out);
        if let Err(err) = &result {
            warn!(width = %self.width, error = %err, "batch engine poisoned");
            self.poisoned = true;
        }
        result
    }

    fn run<M: AsRef<[u8]>>(&mut self, messages: &[M], out: &mut [Digest]) -> Result<(), Error> {
        let rate = self.width.rate();
        let mut backlog = 0..messages.len();
        let mut pending: Vec<(usize, Download<[u64; PLEN]>)> = Vec::with_capacity(messages.len());
        let mut iterations = 0usize;
        self.arena.clear();

        loop {
            self.arena.refill(&mut backlog);
            if self.arena.is_idle() {
                break;
            }

            let mut staged = self.ring.acquire()?;
            let pass = self.arena.gather(messages, rate, staged.as_mut_slice());
            staged.set_filled(staged.capacity());
            self.stream.upload(&self.slots, 0, staged)?;
            self.stream.launch(kernel::absorb_lanes(
                &self.states,
                &self.slots,
                rate,
                rate,
                pass.active,
                pass.reset,
            )?)?;

            // The stream is in order: a later reset of this lane cannot
            // overtake the download.
            for (lane, message) in pass.retired {
                pending.push((message, self.stream.download(&self.states, lane..lane + 1)?));
            }
            iterations += 1;
        }
        trace!(iterations, "all lanes drained");

        for (message, download) in pending {
            let state = download.wait()?;
            out[message] = Digest::from_state(self.width, &state[0]);
        }
        Ok(())
    }
}

impl BatchHasher for Sha3Batch {
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
        Self::calculate(self, messages)
    }
}

impl core::fmt::Debug for Sha3Batch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sha3Batch")
            .field("width", &self.width)
            .field("lanes", &self.arena.capacity())
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use lanes_device::DeviceConfig;

    use super::*;

    #[test]
    fn mixed_lengths_keep_input_order() {
        let device = Device::new(
            DeviceConfig::default()
                .with_kernel_threads(2)
                .with_batch_lanes(3),
        )
        .unwrap();
        let width = DigestWidth::Sha3_512;
        let rate = width.rate();
        let messages: Vec<Vec<u8>> = [5 * rate, 0, rate, 1, 3 * rate - 1, 17, 2 * rate]
            .iter()
            .enumerate()
            .map(|(i, &len)| vec![i as u8 + 1; len])
            .collect();

        let mut batch = Sha3Batch::with_device(width, &device).unwrap();
        assert_eq!(batch.batch_size(), 3);
        let got = batch.calculate(&messages).unwrap();
        for (message, digest) in messages.iter().zip(&got) {
            assert_eq!(digest, &lanes_hash::sha3(width, message), "len={}", message.len());
        }
    }

    #[test]
    fn empty_input_and_length_mismatch() {
        let device = Device::new(DeviceConfig::default().with_kernel_threads(1)).unwrap();
        let mut batch = Sha3Batch::with_device(DigestWidth::Sha3_256, &device).unwrap();
        let none: [&[u8]; 0] = [];
        assert!(batch.calculate(&none).unwrap().is_empty());

        let mut out = [Digest::zeroed(DigestWidth::Sha3_256); 1];
        assert_eq!(
            batch.calculate_into(&[b"a", b"b"], &mut out),
            Err(Error::LengthMismatch {
                expected: 2,
                actual: 1,
            })
        );
        assert!(!batch.is_poisoned());
    }
}
