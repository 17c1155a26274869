//! `sha3-lanes` -- SHA3 digests on a sequential engine, a single-message
//! accelerator engine and a batched lane-array accelerator engine.
//!
//! All engines produce bit-identical FIPS 202 output for SHA3-224, -256,
//! -384 and -512. The sequential [`Sha3`] defines the reference result.

#![deny(unsafe_code)]

pub mod accel;
pub mod batch;
pub mod cpu_batch;
pub mod engine;
mod lanes;

pub use accel::Sha3Accel;
pub use batch::Sha3Batch;
pub use cpu_batch::Sha3CpuBatch;
pub use engine::{BatchHasher, StreamingHasher, corrected_batch_size};
pub use lanes_device as device;
pub use lanes_device::{Device, DeviceConfig, DeviceError};
pub use lanes_hash::{Digest, DigestWidth, HashError, Sha3, sha3};

/// Errors returned by the engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Digest width other than 224, 256, 384 or 512 bits.
    UnsupportedWidth(usize),
    /// Data or a digest was requested after the message was finalized.
    Finalized,
    /// Output slice does not match the number of messages.
    LengthMismatch {
        /// Number of messages.
        expected: usize,
        /// Output slots supplied.
        actual: usize,
    },
    /// The accelerator failed.
    Device(DeviceError),
    /// An earlier accelerator failure left this engine unusable.
    Poisoned,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedWidth(bits) => {
                write!(f, "unsupported digest width: {bits} bits")
            }
            Self::Finalized => f.write_str("message already finalized"),
            Self::LengthMismatch { expected, actual } => {
                write!(f, "length mismatch: expected {expected} outputs, got {actual}")
            }
            Self::Device(err) => write!(f, "{err}"),
            Self::Poisoned => f.write_str("engine poisoned by an earlier device failure"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HashError> for Error {
    fn from(err: HashError) -> Self {
        match err {
            HashError::UnsupportedWidth(bits) => Self::UnsupportedWidth(bits),
            HashError::Finalized => Self::Finalized,
        }
    }
}

impl From<DeviceError> for Error {
    fn from(err: DeviceError) -> Self {
        Self::Device(err)
    }
}
