//! SHA3 absorption kernels.
//!
//! Kernels are validated against their buffers when built and executed by
//! the stream that launches them. Device state is `[u64; 25]` per hash.

use lanes_hash::{LaneMask, MAX_RATE, PLEN, absorb_lane};
use rayon::prelude::*;

use crate::{DeviceBuffer, DeviceError, memory::lock};

type Body = Box<dyn FnOnce(&rayon::ThreadPool) -> Result<(), DeviceError> + Send>;

/// Built kernel ready to be queued with [`Stream::launch`](crate::Stream::launch).
pub struct Kernel {
    name: &'static str,
    body: Body,
}

impl Kernel {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn run(self, pool: &rayon::ThreadPool) -> Result<(), DeviceError> {
        (self.body)(pool)
    }
}

impl core::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kernel").field("name", &self.name).finish()
    }
}

const ABSORB_BLOCKS: &str = "absorb_blocks";
const ABSORB_LANES: &str = "absorb_lanes";

fn reject(kernel: &'static str, reason: String) -> DeviceError {
    DeviceError::Launch { kernel, reason }
}

fn check_rate(kernel: &'static str, rate: usize) -> Result<(), DeviceError> {
    if rate == 0 || rate > MAX_RATE || rate % 8 != 0 {
        return Err(reject(kernel, format!("rate {rate} is not a SHA3 rate")));
    }
    Ok(())
}

/// Absorb `nblocks` consecutive rate blocks from the start of `blocks` into
/// the single state in `state[0]`.
pub fn absorb_blocks(
    state: &DeviceBuffer<[u64; PLEN]>, blocks: &DeviceBuffer<u8>, nblocks: usize, rate: usize,
) -> Result<Kernel, DeviceError> {
    check_rate(ABSORB_BLOCKS, rate)?;
    if state.is_empty() {
        return Err(reject(ABSORB_BLOCKS, "empty state buffer".into()));
    }
    let needed = nblocks
        .checked_mul(rate)
        .filter(|&n| n <= blocks.len())
        .ok_or_else(|| {
            reject(
                ABSORB_BLOCKS,
                format!("{nblocks} blocks of {rate} bytes exceed {}", blocks.len()),
            )
        })?;

    let state = state.storage();
    let blocks = blocks.storage();
    Ok(Kernel {
        name: ABSORB_BLOCKS,
        body: Box::new(move |_pool| {
            let mut state = lock(&state, ABSORB_BLOCKS)?;
            let blocks = lock(&blocks, ABSORB_BLOCKS)?;
            let state = &mut state[0];
            for block in blocks[..needed].chunks_exact(rate) {
                absorb_lane(state, block, rate);
            }
            Ok(())
        }),
    })
}

/// Advance every lane in `active` by one block, in parallel.
///
/// Lane `i` reads its block from `staging[i * slot_len..][..rate]`. Lanes in
/// `reset` start from the zero state first.
pub fn absorb_lanes(
    states: &DeviceBuffer<[u64; PLEN]>, staging: &DeviceBuffer<u8>, slot_len: usize, rate: usize,
    active: LaneMask, reset: LaneMask,
) -> Result<Kernel, DeviceError> {
    check_rate(ABSORB_LANES, rate)?;
    let lanes = active.capacity();
    if slot_len < rate {
        return Err(reject(
            ABSORB_LANES,
            format!("slot of {slot_len} bytes cannot hold a {rate}-byte block"),
        ));
    }
    if lanes > states.len() || reset.capacity() != lanes {
        return Err(reject(
            ABSORB_LANES,
            format!("{lanes} lanes over {} states", states.len()),
        ));
    }
    if lanes.checked_mul(slot_len).is_none_or(|n| n > staging.len()) {
        return Err(reject(
            ABSORB_LANES,
            format!("{lanes} slots of {slot_len} bytes exceed {}", staging.len()),
        ));
    }

    let states = states.storage();
    let staging = staging.storage();
    Ok(Kernel {
        name: ABSORB_LANES,
        body: Box::new(move |pool| {
            let mut states = lock(&states, ABSORB_LANES)?;
            let staging = lock(&staging, ABSORB_LANES)?;
            let (states, staging) = (&mut states[..lanes], &staging[..lanes * slot_len]);
            pool.install(|| {
                states
                    .par_iter_mut()
                    .zip(staging.par_chunks_exact(slot_len))
                    .enumerate()
                    .with_min_len(4)
                    .for_each(|(lane, (state, slot))| {
                        if !active.contains(lane) {
                            return;
                        }
                        if reset.contains(lane) {
                            *state = [0; PLEN];
                        }
                        absorb_lane(state, slot, rate);
                    });
            });
            Ok(())
        }),
    })
}

#[cfg(test)]
mod tests {
    use lanes_hash::{DigestWidth, Sponge, pad_block, squeeze};

    use super::*;
    use crate::{Device, DeviceConfig, StagingRing};

    fn device() -> Device {
        Device::new(DeviceConfig::default().with_kernel_threads(4)).unwrap()
    }

    #[test]
    fn absorb_blocks_matches_host_sponge() {
        let width = DigestWidth::Sha3_384;
        let rate = width.rate();
        let device = device();
        let stream = device.create_stream().unwrap();
        let ring = StagingRing::new(2, 3 * rate);

        let message: Vec<u8> = (0..3 * rate).map(|i| i as u8).collect();
        let state = device.alloc::<[u64; PLEN]>(1).unwrap();
        let blocks = device.alloc::<u8>(3 * rate).unwrap();
        let mut staged = ring.acquire().unwrap();
        staged.extend_from(&message);
        stream.upload(&blocks, 0, staged).unwrap();
        stream.launch(absorb_blocks(&state, &blocks, 3, rate).unwrap()).unwrap();
        let got = stream.download(&state, 0..1).unwrap().wait().unwrap();

        let mut sponge = Sponge::new(width);
        for block in message.chunks_exact(rate) {
            sponge.absorb_block(block);
        }
        assert_eq!(&got[0], sponge.state());
    }

    #[test]
    fn absorb_lanes_hashes_independent_messages() {
        let width = DigestWidth::Sha3_256;
        let rate = width.rate();
        let lanes = 70;
        let device = device();
        let stream = device.create_stream().unwrap();
        let ring = StagingRing::new(2, lanes * rate);

        let states = device.alloc::<[u64; PLEN]>(lanes).unwrap();
        let staging = device.alloc::<u8>(lanes * rate).unwrap();
        stream.fill(&states, [u64::MAX; PLEN]).unwrap();

        let mut staged = ring.acquire().unwrap();
        let mut active = LaneMask::new(lanes);
        let mut reset = LaneMask::new(lanes);
        for lane in (0..lanes).filter(|l| l % 3 != 1) {
            let block = pad_block(&[lane as u8; 5], rate);
            staged.as_mut_slice()[lane * rate..(lane + 1) * rate].copy_from_slice(&block[..rate]);
            active.set(lane);
            reset.set(lane);
        }
        staged.set_filled(lanes * rate);
        stream.upload(&staging, 0, staged).unwrap();
        stream
            .launch(absorb_lanes(&states, &staging, rate, rate, active, reset).unwrap())
            .unwrap();
        let got = stream.download(&states, 0..lanes).unwrap().wait().unwrap();

        for (lane, state) in got.iter().enumerate() {
            if lane % 3 == 1 {
                assert_eq!(state, &[u64::MAX; PLEN], "idle lane {lane} touched");
                continue;
            }
            let mut out = [0u8; 32];
            squeeze(state, &mut out);
            assert_eq!(out, lanes_hash::sha3(width, [lane as u8; 5]).as_bytes());
        }
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let device = device();
        let states = device.alloc::<[u64; PLEN]>(2).unwrap();
        let staging = device.alloc::<u8>(136).unwrap();
        assert!(absorb_blocks(&states, &staging, 2, 136).is_err());
        assert!(absorb_blocks(&states, &staging, 1, 100).is_err());
        assert!(
            absorb_lanes(&states, &staging, 136, 136, LaneMask::new(2), LaneMask::new(2))
                .is_err()
        );
        assert!(
            absorb_lanes(&states, &staging, 136, 136, LaneMask::new(1), LaneMask::new(1))
                .is_ok()
        );
    }
}
