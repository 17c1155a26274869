//! Host-emulated parallel accelerator.
//!
//! The runtime mirrors the shape of a discrete compute device: memory that
//! is allocated and released against a budget, in-order streams that carry
//! uploads, kernel launches and downloads, and a ring of reusable host
//! staging buffers that bounds how far the host may run ahead. Kernels run
//! on a dedicated thread pool owned by the device.

mod config;
mod device;
mod error;
#[cfg(feature = "fault-injection")]
mod fault;
pub mod kernel;
mod memory;
mod staging;
mod stream;

pub use config::{DeviceConfig, MAX_BATCH_LANES};
pub use device::Device;
pub use error::DeviceError;
#[cfg(feature = "fault-injection")]
pub use fault::Fault;
pub use kernel::Kernel;
pub use memory::DeviceBuffer;
pub use staging::{StagingBuffer, StagingRing};
pub use stream::{Download, Stream};
