//! Shared plumbing for the `sha3sum`, `sha3-batch` and `sha3-bench`
//! command-line tools.

#![deny(unsafe_code)]

pub mod args;
pub mod bench;
pub mod files;

use std::{io, path::PathBuf};

use tracing_subscriber::EnvFilter;

/// Failures surfaced by the tools.
#[derive(Debug)]
pub enum ToolError {
    /// Reading an input or writing an output failed.
    Io {
        path: Option<PathBuf>,
        source: io::Error,
    },
    /// An engine failed.
    Hash(sha3_lanes::Error),
}

impl ToolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }
}

impl core::fmt::Display for ToolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io {
                path: Some(path),
                source,
            } => write!(f, "{}: {source}", path.display()),
            Self::Io { path: None, source } => write!(f, "{source}"),
            Self::Hash(err) => write!(f, "{err}"),
        }
    }
}

impl core::error::Error for ToolError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Hash(err) => Some(err),
        }
    }
}

impl From<io::Error> for ToolError {
    fn from(source: io::Error) -> Self {
        Self::Io { path: None, source }
    }
}

impl From<sha3_lanes::Error> for ToolError {
    fn from(err: sha3_lanes::Error) -> Self {
        Self::Hash(err)
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second call (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
