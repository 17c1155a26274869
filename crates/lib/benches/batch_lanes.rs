//! Batch throughput as a function of lane capacity, against the CPU batch.
//!
//! Each group hashes a fixed set of equal-length messages; only the number
//! of lanes in the batched engine changes between runs.

use core::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pprof::criterion::{Output, PProfProfiler};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha3_lanes::{Device, DeviceConfig, DigestWidth, Sha3Batch, Sha3CpuBatch};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const LANES: [usize; 4] = [32, 64, 128, 256];
const MESSAGES: usize = 256;

fn messages(len: usize) -> Vec<Vec<u8>> {
    let mut rng = ChaCha8Rng::seed_from_u64(len as u64);
    (0..MESSAGES)
        .map(|_| {
            let mut m = vec![0u8; len];
            rng.fill_bytes(&mut m);
            m
        })
        .collect()
}

fn bench_lanes_for(c: &mut Criterion, width: DigestWidth, len: usize) {
    let mut g = c.benchmark_group(format!("batch/{width}/{}k", len >> 10));
    g.sample_size(10);
    g.throughput(Throughput::Bytes((MESSAGES * len) as u64));
    let input = messages(len);

    for lanes in LANES {
        let device = Device::new(DeviceConfig::from_env().with_batch_lanes(lanes))
            .expect("device");
        let mut batch = Sha3Batch::with_device(width, &device).expect("batch engine");
        g.bench_function(BenchmarkId::new("lanes", lanes), |b| {
            b.iter(|| black_box(batch.calculate(black_box(&input)).expect("calculate")));
        });
    }

    let cpu = Sha3CpuBatch::new(width);
    g.bench_function(BenchmarkId::new("cpu", cpu.batch_size()), |b| {
        b.iter(|| black_box(cpu.calculate(black_box(&input))));
    });

    g.finish();
}

fn batch_lane_benches(c: &mut Criterion) {
    bench_lanes_for(c, DigestWidth::Sha3_256, 4 << 10);
    bench_lanes_for(c, DigestWidth::Sha3_512, 64 << 10);
}

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(1000, Output::Flamegraph(None)));
    targets = batch_lane_benches
}
criterion_main!(benches);
