/// Accelerator failures. All of them are fatal to the operation that hit
/// them; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Configuration value out of range.
    InvalidConfig(&'static str),
    /// Runtime could not be brought up.
    Init(String),
    /// Allocation would exceed the device memory limit.
    OutOfMemory {
        /// Bytes asked for.
        requested: usize,
        /// Bytes still free at the time of the request.
        available: usize,
    },
    /// Host/device copy failed or was out of bounds.
    Transfer(String),
    /// Kernel rejected its arguments or failed while running.
    Launch {
        kernel: &'static str,
        reason: String,
    },
    /// The stream worker is gone.
    StreamClosed,
}

impl core::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidConfig(what) => write!(f, "invalid device config: {what}"),
            Self::Init(reason) => write!(f, "device init failed: {reason}"),
            Self::OutOfMemory {
                requested,
                available,
            } => write!(
                f,
                "device out of memory: requested {requested} bytes, {available} available"
            ),
            Self::Transfer(reason) => write!(f, "device transfer failed: {reason}"),
            Self::Launch { kernel, reason } => {
                write!(f, "kernel `{kernel}` failed: {reason}")
            }
            Self::StreamClosed => f.write_str("device stream closed"),
        }
    }
}

impl core::error::Error for DeviceError {}
