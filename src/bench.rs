//! Timing runs behind `sha3-bench`, written as CSV.

use std::{
    io::Write,
    time::{Duration, Instant},
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha3_lanes::{
    BatchHasher, DigestWidth, Sha3, Sha3Accel, Sha3Batch, Sha3CpuBatch, StreamingHasher,
    corrected_batch_size,
};
use tracing::info;

use crate::ToolError;

/// Warm-up input is capped at this many bytes per message.
const WARM_UP: usize = 1 << 20;

/// Which engine family a CSV row measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunKind {
    Cpu,
    Accel,
}

impl RunKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cpu => "Cpu",
            Self::Accel => "Accel",
        }
    }
}

/// `cpu_runs` host rows followed by `accel_runs` accelerator rows.
#[must_use]
pub fn run_kinds(cpu_runs: usize, accel_runs: usize) -> Vec<RunKind> {
    let mut kinds = vec![RunKind::Cpu; cpu_runs];
    kinds.resize(cpu_runs + accel_runs, RunKind::Accel);
    kinds
}

/// `1024` -> `1kb`, `10485760` -> `10mb`.
#[must_use]
pub fn size_label(bytes: usize) -> String {
    const SUFFIXES: [&str; 4] = ["b", "kb", "mb", "gb"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024 && value % 1024 == 0 && unit < SUFFIXES.len() - 1 {
        value /= 1024;
        unit += 1;
    }
    format!("{value}{}", SUFFIXES[unit])
}

pub fn write_header(out: &mut impl Write, sizes: &[usize], batch: bool) -> std::io::Result<()> {
    if batch {
        out.write_all(b"Batch size,")?;
    }
    out.write_all(b"Type")?;
    for &size in sizes {
        write!(out, ",{}", size_label(size))?;
    }
    writeln!(out)
}

/// Deterministic pseudo-random bytes.
#[must_use]
pub fn random_data(len: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0u8; len];
    ChaCha8Rng::seed_from_u64(seed).fill_bytes(&mut data);
    data
}

/// Time one full message after a short warm-up message.
pub fn measure_single<H: StreamingHasher>(
    hasher: &mut H, data: &[u8],
) -> Result<Duration, ToolError> {
    hasher.add(&data[..data.len().min(WARM_UP)])?;
    hasher.digest()?;
    hasher.init()?;

    let start = Instant::now();
    hasher.add(data)?;
    hasher.digest()?;
    Ok(start.elapsed())
}

/// Time one batch call after a warm-up call on truncated messages.
pub fn measure_batch<B: BatchHasher>(
    engine: &mut B, messages: &[&[u8]],
) -> Result<Duration, ToolError> {
    let trimmed: Vec<&[u8]> = messages
        .iter()
        .map(|m| &m[..m.len().min(WARM_UP)])
        .collect();
    engine.calculate(&trimmed)?;

    let start = Instant::now();
    engine.calculate(messages)?;
    Ok(start.elapsed())
}

fn write_millis(out: &mut impl Write, elapsed: Duration) -> std::io::Result<()> {
    write!(out, ",{:.3}", elapsed.as_secs_f64() * 1e3)?;
    out.flush()
}

/// One row per run kind, one column per size, each cell a fresh engine.
pub fn run_single(
    out: &mut impl Write, width: DigestWidth, sizes: &[usize], kinds: &[RunKind],
) -> Result<(), ToolError> {
    write_header(out, sizes, false)?;
    let max = sizes.iter().copied().max().unwrap_or(0);
    let data = random_data(max, 1);
    info!(%width, bytes = max, rows = kinds.len(), "single benchmark");

    for &kind in kinds {
        out.write_all(kind.label().as_bytes())?;
        for &size in sizes {
            let elapsed = match kind {
                RunKind::Cpu => measure_single(&mut Sha3::new(width), &data[..size])?,
                RunKind::Accel => measure_single(&mut Sha3Accel::new(width)?, &data[..size])?,
            };
            write_millis(out, elapsed)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Batch size used for a row: `requested`, or its corrected value.
#[must_use]
pub const fn row_batch_size(requested: usize, native: usize, correction: bool) -> usize {
    if correction {
        corrected_batch_size(requested, native)
    } else {
        requested
    }
}

/// One row per run kind; each cell hashes a batch of equal-sized messages.
pub fn run_batch(
    out: &mut impl Write, width: DigestWidth, sizes: &[usize], batch_size: usize,
    kinds: &[RunKind], correction: bool,
) -> Result<(), ToolError> {
    let mut cpu = Sha3CpuBatch::new(width);
    let mut accel = if kinds.contains(&RunKind::Accel) {
        Some(Sha3Batch::new(width)?)
    } else {
        None
    };
    let native = |kind: RunKind| match (kind, &accel) {
        (RunKind::Accel, Some(engine)) => engine.batch_size(),
        _ => cpu.batch_size(),
    };
    let rows: Vec<(RunKind, usize)> = kinds
        .iter()
        .map(|&kind| (kind, row_batch_size(batch_size, native(kind), correction)))
        .collect();

    write_header(out, sizes, true)?;
    let max = sizes.iter().copied().max().unwrap_or(0);
    let count = rows.iter().map(|&(_, n)| n).max().unwrap_or(0);
    let messages: Vec<Vec<u8>> = (0..count).map(|i| random_data(max, i as u64)).collect();
    info!(%width, messages = count, bytes = max, rows = rows.len(), "batch benchmark");

    for (kind, rows_batch) in rows {
        write!(out, "{rows_batch},{}", kind.label())?;
        for &size in sizes {
            let local: Vec<&[u8]> = messages[..rows_batch].iter().map(|m| &m[..size]).collect();
            let elapsed = match (kind, accel.as_mut()) {
                (RunKind::Accel, Some(engine)) => measure_batch(engine, &local)?,
                _ => measure_batch(&mut cpu, &local)?,
            };
            write_millis(out, elapsed)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_binary_units() {
        assert_eq!(size_label(512), "512b");
        assert_eq!(size_label(1024), "1kb");
        assert_eq!(size_label(10 << 20), "10mb");
        assert_eq!(size_label(3 << 30), "3gb");
        assert_eq!(size_label(1536), "1536b");
    }

    #[test]
    fn header_layout() {
        let mut out = Vec::new();
        write_header(&mut out, &[1 << 20, 10 << 20], false).unwrap();
        assert_eq!(out, b"Type,1mb,10mb\n");
        out.clear();
        write_header(&mut out, &[1 << 20], true).unwrap();
        assert_eq!(out, b"Batch size,Type,1mb\n");
    }

    #[test]
    fn kinds_are_cpu_then_accel() {
        assert_eq!(
            run_kinds(2, 1),
            [RunKind::Cpu, RunKind::Cpu, RunKind::Accel]
        );
        assert!(run_kinds(0, 0).is_empty());
    }

    #[test]
    fn row_batch_size_respects_correction_flag() {
        assert_eq!(row_batch_size(64, 128, true), 128);
        assert_eq!(row_batch_size(64, 128, false), 64);
        assert_eq!(row_batch_size(300, 8, true), 296);
    }
}
