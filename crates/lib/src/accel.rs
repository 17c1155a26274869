//! Single-message accelerator engine.
//!
//! Input is copied into host staging buffers drawn from a small ring. Each
//! full buffer is queued on the stream as one upload followed by one
//! `absorb_blocks` kernel, and the host moves straight on to the next ring
//! buffer. Copying new input therefore overlaps the transfer and absorption
//! of earlier input; the host only waits when every ring buffer is in flight.

use lanes_device::{Device, DeviceBuffer, StagingBuffer, StagingRing, Stream, kernel};
use lanes_hash::{Digest, DigestWidth, PLEN, pad_block};
use tracing::{debug, debug_span, warn};

use crate::{Error, engine::StreamingHasher};

pub struct Sha3Accel {
    width: DigestWidth,
    state: DeviceBuffer<[u64; PLEN]>,
    blocks: DeviceBuffer<u8>,
    ring: StagingRing,
    current: Option<StagingBuffer>,
    stream: Stream,
    finished: bool,
    poisoned: bool,
}

impl Sha3Accel {
    /// Engine on the process-wide [`Device::shared`] accelerator.
    pub fn new(width: DigestWidth) -> Result<Self, Error> {
        Self::with_device(width, &Device::shared()?)
    }

    /// Engine on `device`. Buffer sizes follow the device configuration.
    pub fn with_device(width: DigestWidth, device: &Device) -> Result<Self, Error> {
        let config = device.config();
        let buffer_len = config.staging_blocks * width.rate();

        let state = device.alloc::<[u64; PLEN]>(1)?;
        let blocks = device.alloc::<u8>(buffer_len)?;
        let stream = device.create_stream()?;
        let ring = StagingRing::new(config.staging_depth, buffer_len);

        debug!(
            %width,
            ordinal = device.ordinal(),
            staging_depth = config.staging_depth,
            buffer_len,
            "accelerator engine ready"
        );
        Ok(Self {
            width,
            state,
            blocks,
            ring,
            current: None,
            stream,
            finished: false,
            poisoned: false,
        })
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> DigestWidth {
        self.width
    }

    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Start a new message, discarding anything absorbed so far.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        self.current = None;
        let reset = self.stream.fill(&self.state, [0; PLEN]).map_err(Error::from);
        self.guard(reset)?;
        self.finished = false;
        Ok(())
    }

    /// Absorb `data`.
    pub fn add(&mut self, data: &[u8]) -> Result<(), Error> {
        self.check_open()?;
        let absorbed = self.absorb(data);
        self.guard(absorbed)
    }

    /// Pad, absorb the final block and return the digest.
    pub fn digest(&mut self) -> Result<Digest, Error> {
        self.check_open()?;
        let _span = debug_span!("digest", width = %self.width).entered();
        let digest = self.finish();
        let digest = self.guard(digest)?;
        self.finished = true;
        Ok(digest)
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        if self.finished {
            return Err(Error::Finalized);
        }
        Ok(())
    }

    fn guard<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(Error::Device(err)) = &result {
            warn!(width = %self.width, error = %err, "accelerator engine poisoned");
            self.poisoned = true;
            self.current = None;
        }
        result
    }

    fn staged(&mut self) -> Result<&mut StagingBuffer, Error> {
        match self.current {
            Some(ref mut staged) => Ok(staged),
            None => Ok(self.current.insert(self.ring.acquire()?)),
        }
    }

    fn absorb(&mut self, mut data: &[u8]) -> Result<(), Error> {
        while !data.is_empty() {
            let staged = self.staged()?;
            let n = staged.extend_from(data);
            data = &data[n..];
            if staged.is_full() {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// Queue the current staging buffer, which holds whole blocks only.
    fn flush(&mut self) -> Result<(), Error> {
        let Some(staged) = self.current.take() else {
            return Ok(());
        };
        let rate = self.width.rate();
        let nblocks = staged.filled() / rate;
        if nblocks == 0 {
            return Ok(());
        }
        self.stream.upload(&self.blocks, 0, staged)?;
        self.stream
            .launch(kernel::absorb_blocks(&self.state, &self.blocks, nblocks, rate)?)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<Digest, Error> {
        let rate = self.width.rate();
        let staged = self.staged()?;

        // A buffer is flushed as soon as it fills, so at least one block of
        // room is left after the whole blocks.
        let whole = staged.filled() / rate * rate;
        let last = pad_block(&staged.as_filled()[whole..], rate);
        staged.as_mut_slice()[whole..whole + rate].copy_from_slice(&last[..rate]);
        staged.set_filled(whole + rate);
        self.flush()?;

        let state = self.stream.download(&self.state, 0..1)?.wait()?;
        Ok(Digest::from_state(self.width, &state[0]))
    }
}

impl StreamingHasher for Sha3Accel {
    fn width(&self) -> DigestWidth {
        self.width
    }

    fn init(&mut self) -> Result<(), Error> {
        Self::init(self)
    }

    fn add(&mut self, data: &[u8]) -> Result<(), Error> {
        Self::add(self, data)
    }

    fn digest(&mut self) -> Result<Digest, Error> {
        Self::digest(self)
    }
}

impl core::fmt::Debug for Sha3Accel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sha3Accel")
            .field("width", &self.width)
            .field("finished", &self.finished)
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use lanes_device::DeviceConfig;

    use super::*;

    fn small_device() -> Device {
        let config = DeviceConfig::default()
            .with_kernel_threads(2)
            .with_staging(2, 2);
        Device::new(config).unwrap()
    }

    #[test]
    fn matches_sequential_across_buffer_boundaries() {
        let device = small_device();
        for width in DigestWidth::ALL {
            let rate = width.rate();
            let data: Vec<u8> = (0..9 * rate + 5).map(|i| (i * 7) as u8).collect();
            for len in [0, rate - 1, rate, 2 * rate - 1, 2 * rate, 2 * rate + 1, 9 * rate + 5] {
                let mut h = Sha3Accel::with_device(width, &device).unwrap();
                for chunk in data[..len].chunks(rate / 3 + 1) {
                    h.add(chunk).unwrap();
                }
                assert_eq!(
                    h.digest().unwrap(),
                    lanes_hash::sha3(width, &data[..len]),
                    "{width} len={len}"
                );
            }
        }
        assert_eq!(device.memory_in_use(), 0);
    }

    #[test]
    fn lifecycle_errors_and_reuse() {
        let device = small_device();
        let mut h = Sha3Accel::with_device(DigestWidth::Sha3_224, &device).unwrap();
        h.add(b"discarded").unwrap();
        h.init().unwrap();
        h.add(b"123").unwrap();
        assert_eq!(
            h.digest().unwrap().to_hex(),
            "602bdc204140db016bee5374895e5568ce422fabe17e064061d80097"
        );
        assert_eq!(h.add(b"x"), Err(Error::Finalized));
        assert_eq!(h.digest(), Err(Error::Finalized));

        h.init().unwrap();
        assert_eq!(h.digest().unwrap(), lanes_hash::sha3(DigestWidth::Sha3_224, b""));
    }
}
