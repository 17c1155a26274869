//! Device runtime configuration (defaults + environment overrides).
//!
//! Overrides are read once per process:
//! - `SHA3_LANES_MEMORY_LIMIT`: device memory cap in bytes
//! - `SHA3_LANES_KERNEL_THREADS`: kernel worker threads (`0` = one per core)
//! - `SHA3_LANES_STAGING_DEPTH`: host staging buffers per streaming engine
//! - `SHA3_LANES_STAGING_BLOCKS`: rate blocks per staging buffer
//! - `SHA3_LANES_BATCH_LANES`: lane capacity of batched engines

use std::sync::OnceLock;

use crate::DeviceError;

/// Upper bound on batch lanes; keeps the lane arena and its masks small.
pub const MAX_BATCH_LANES: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Cap on bytes held by live device buffers. `None` means unbounded.
    pub memory_limit: Option<usize>,
    /// Threads in the kernel pool; `0` lets the pool pick.
    pub kernel_threads: usize,
    /// Host staging buffers in the streaming engine's ring.
    pub staging_depth: usize,
    /// Rate-sized blocks carried by one staging buffer.
    pub staging_blocks: usize,
    /// Number of lane slots in a batched engine.
    pub batch_lanes: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            memory_limit: None,
            kernel_threads: 0,
            staging_depth: 4,
            staging_blocks: 128,
            batch_lanes: 128,
        }
    }
}

impl DeviceConfig {
    #[must_use]
    pub const fn with_memory_limit(mut self, limit: Option<usize>) -> Self {
        self.memory_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_kernel_threads(mut self, threads: usize) -> Self {
        self.kernel_threads = threads;
        self
    }

    #[must_use]
    pub const fn with_staging(mut self, depth: usize, blocks: usize) -> Self {
        self.staging_depth = depth;
        self.staging_blocks = blocks;
        self
    }

    #[must_use]
    pub const fn with_batch_lanes(mut self, lanes: usize) -> Self {
        self.batch_lanes = lanes;
        self
    }

    /// Reject values no engine can run with.
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.staging_depth < 2 {
            return Err(DeviceError::InvalidConfig(
                "staging_depth must be at least 2",
            ));
        }
        if self.staging_blocks == 0 {
            return Err(DeviceError::InvalidConfig("staging_blocks must be non-zero"));
        }
        if self.batch_lanes == 0 || self.batch_lanes > MAX_BATCH_LANES {
            return Err(DeviceError::InvalidConfig(
                "batch_lanes must be within 1..=4096",
            ));
        }
        Ok(())
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let o = overrides();
        let mut config = Self::default();
        if let Some(limit) = o.memory_limit {
            config.memory_limit = Some(limit);
        }
        if let Some(threads) = o.kernel_threads {
            config.kernel_threads = threads;
        }
        if let Some(depth) = o.staging_depth {
            config.staging_depth = depth;
        }
        if let Some(blocks) = o.staging_blocks {
            config.staging_blocks = blocks;
        }
        if let Some(lanes) = o.batch_lanes {
            config.batch_lanes = lanes;
        }
        config
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Overrides {
    memory_limit: Option<usize>,
    kernel_threads: Option<usize>,
    staging_depth: Option<usize>,
    staging_blocks: Option<usize>,
    batch_lanes: Option<usize>,
}

fn parse_usize(value: &str) -> Option<usize> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.replace('_', "").parse::<usize>().ok()
}

fn read_env_overrides() -> Overrides {
    let var = |name: &str| std::env::var(name).ok().as_deref().and_then(parse_usize);
    Overrides {
        memory_limit: var("SHA3_LANES_MEMORY_LIMIT"),
        kernel_threads: var("SHA3_LANES_KERNEL_THREADS"),
        staging_depth: var("SHA3_LANES_STAGING_DEPTH"),
        staging_blocks: var("SHA3_LANES_STAGING_BLOCKS"),
        batch_lanes: var("SHA3_LANES_BATCH_LANES"),
    }
}

fn overrides() -> Overrides {
    static OVERRIDES: OnceLock<Overrides> = OnceLock::new();
    *OVERRIDES.get_or_init(read_env_overrides)
}
