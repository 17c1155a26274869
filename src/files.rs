//! File input for the hashing tools.

use std::{
    collections::BTreeSet,
    fs::{self, File},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use sha3_lanes::{BatchHasher, Digest, StreamingHasher};
use tracing::debug;

use crate::ToolError;

/// Read size for streamed input.
pub const CHUNK: usize = 1 << 20;

/// Feed `reader` to `hasher` in [`CHUNK`]-sized reads and finalize.
pub fn hash_reader<H: StreamingHasher>(
    hasher: &mut H, mut reader: impl Read,
) -> Result<Digest, ToolError> {
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.add(&buf[..n])?;
    }
    Ok(hasher.digest()?)
}

pub fn hash_file<H: StreamingHasher>(hasher: &mut H, path: &Path) -> Result<Digest, ToolError> {
    let file = File::open(path).map_err(|e| ToolError::io(path, e))?;
    hash_reader(hasher, file).map_err(|err| match err {
        ToolError::Io { path: None, source } => ToolError::io(path, source),
        other => other,
    })
}

/// Inputs minus exclusions, deduplicated and sorted.
#[must_use]
pub fn select_inputs(inputs: &[PathBuf], exclude: &[PathBuf]) -> Vec<PathBuf> {
    let exclude: BTreeSet<&PathBuf> = exclude.iter().collect();
    inputs
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|path| !exclude.contains(path))
        .cloned()
        .collect()
}

/// Outcome of [`hash_files`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub hashed: usize,
    pub skipped: usize,
}

/// Hash `files` in batches of up to `batch_size` readable files, writing
/// `path hexdigest` lines to `out` in order. Unreadable files are reported
/// on `errors` and skipped.
pub fn hash_files<B: BatchHasher>(
    engine: &mut B, files: &[PathBuf], batch_size: usize, out: &mut impl Write,
    errors: &mut impl Write,
) -> Result<BatchReport, ToolError> {
    let mut report = BatchReport::default();
    let mut pending = files.iter();
    let batch_size = batch_size.max(1);

    loop {
        let mut names = Vec::with_capacity(batch_size);
        let mut contents = Vec::with_capacity(batch_size);
        for path in pending.by_ref() {
            match fs::read(path) {
                Ok(data) => {
                    names.push(path);
                    contents.push(data);
                }
                Err(e) => {
                    writeln!(errors, "Unable to open file {}: {e}", path.display())?;
                    report.skipped += 1;
                }
            }
            if contents.len() == batch_size {
                break;
            }
        }
        if contents.is_empty() {
            break;
        }

        debug!(files = contents.len(), "hashing batch");
        let digests = engine.calculate(&contents)?;
        for (path, digest) in names.iter().zip(&digests) {
            writeln!(out, "{} {digest}", path.display())?;
        }
        report.hashed += digests.len();
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_dedups_sorts_and_excludes() {
        let p = |s: &str| PathBuf::from(s);
        let got = select_inputs(&[p("c"), p("a"), p("b"), p("a")], &[p("b"), p("z")]);
        assert_eq!(got, [p("a"), p("c")]);
    }

    #[test]
    fn reader_is_chunk_independent() {
        let data: Vec<u8> = (0..(CHUNK + 77)).map(|i| i as u8).collect();
        let mut h = sha3_lanes::Sha3::new(sha3_lanes::DigestWidth::Sha3_256);
        let got = hash_reader(&mut h, &data[..]).unwrap();
        assert_eq!(got, sha3_lanes::sha3(sha3_lanes::DigestWidth::Sha3_256, &data));
    }
}
