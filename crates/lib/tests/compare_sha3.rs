//! Byte-for-byte comparison against the RustCrypto `sha3` crate.
//! Every engine must agree with it for any message and any chunking.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha3_lanes::{
    Device, DeviceConfig, DigestWidth, Sha3, Sha3Accel, Sha3Batch, Sha3CpuBatch,
    StreamingHasher,
};

fn random_messages(seed: u64, count: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut m = vec![0u8; rng.gen_range(0..=max_len)];
            rng.fill(&mut m[..]);
            m
        })
        .collect()
}

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    ChaCha8Rng::seed_from_u64(seed).fill(&mut data[..]);
    data
}

fn device(lanes: usize) -> Device {
    Device::new(
        DeviceConfig::default()
            .with_kernel_threads(3)
            .with_staging(3, 4)
            .with_batch_lanes(lanes),
    )
    .unwrap()
}

fn feed(h: &mut impl StreamingHasher, data: &[u8], seed: u64) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rest = data;
    while !rest.is_empty() {
        let n = rng.gen_range(0..=rest.len().min(1000));
        h.add(&rest[..n]).unwrap();
        rest = &rest[n..];
    }
    h.digest().unwrap().as_bytes().to_vec()
}

macro_rules! compare_tests {
    ($width:expr, $theirs:ty, $mod:ident) => {
        mod $mod {
            use sha3::Digest as _;

            use super::*;

            const WIDTH: DigestWidth = $width;

            fn reference(data: &[u8]) -> Vec<u8> {
                <$theirs>::digest(data).to_vec()
            }

            #[test]
            fn streaming_engines_match() {
                let device = device(4);
                let rate = WIDTH.rate();
                let mut lens = vec![0, 1, rate - 1, rate, rate + 1, 4 * rate, 4 * rate + 1];
                lens.extend(random_messages(1, 6, 5000).iter().map(Vec::len));
                for (i, len) in lens.into_iter().enumerate() {
                    let data = random_bytes(100 + i as u64, len);
                    let expected = reference(&data);

                    let mut seq = Sha3::new(WIDTH);
                    assert_eq!(feed(&mut seq, &data, i as u64), expected, "sequential len={len}");

                    let mut accel = Sha3Accel::with_device(WIDTH, &device).unwrap();
                    assert_eq!(feed(&mut accel, &data, i as u64), expected, "accel len={len}");
                }
            }

            #[test]
            fn batch_engines_match() {
                let device = device(5);
                let mut batch = Sha3Batch::with_device(WIDTH, &device).unwrap();
                let cpu = Sha3CpuBatch::new(WIDTH);

                // More messages than lanes, lengths in random order.
                let messages = random_messages(7, 23, 3 * WIDTH.rate() + 7);
                let got = batch.calculate(&messages).unwrap();
                let got_cpu = cpu.calculate(&messages);
                for (i, m) in messages.iter().enumerate() {
                    let expected = reference(m);
                    assert_eq!(got[i].as_bytes(), expected, "batch message {i}");
                    assert_eq!(got_cpu[i].as_bytes(), expected, "cpu message {i}");
                }

                // The engine is reusable across calls.
                let again = batch.calculate(&messages[..5]).unwrap();
                assert_eq!(again, got[..5]);
            }

            #[test]
            fn decreasing_then_increasing_lengths() {
                let device = device(4);
                let mut batch = Sha3Batch::with_device(WIDTH, &device).unwrap();
                let rate = WIDTH.rate();
                let lens = (0..10)
                    .rev()
                    .map(|k| k * rate + k % 3)
                    .chain((0..10).map(|k| k * rate));
                let messages: Vec<Vec<u8>> = lens
                    .enumerate()
                    .map(|(i, len)| random_bytes(300 + i as u64, len))
                    .collect();

                let got = batch.calculate(&messages).unwrap();
                assert_eq!(got.len(), 20);
                for (i, m) in messages.iter().enumerate() {
                    assert_eq!(got[i].as_bytes(), reference(m), "message {i} len={}", m.len());
                }
            }

            #[test]
            fn whole_generations_of_lanes() {
                for lanes in [1, 3, 4] {
                    let device = device(lanes);
                    let mut batch = Sha3Batch::with_device(WIDTH, &device).unwrap();
                    for generations in [2, 3] {
                        let count = generations * lanes;
                        let messages = random_messages(40 + count as u64, count, 2 * WIDTH.rate());
                        let got = batch.calculate(&messages).unwrap();
                        assert_eq!(got.len(), count);
                        for (i, m) in messages.iter().enumerate() {
                            assert_eq!(got[i].as_bytes(), reference(m), "lanes={lanes} message {i}");
                        }
                    }
                }
            }
        }
    };
}

compare_tests!(DigestWidth::Sha3_224, sha3::Sha3_224, sha3_224);
compare_tests!(DigestWidth::Sha3_256, sha3::Sha3_256, sha3_256);
compare_tests!(DigestWidth::Sha3_384, sha3::Sha3_384, sha3_384);
compare_tests!(DigestWidth::Sha3_512, sha3::Sha3_512, sha3_512);
