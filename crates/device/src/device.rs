use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicUsize, Ordering},
};

use tracing::{debug, info};

use crate::{DeviceBuffer, DeviceConfig, DeviceError, Stream};

static NEXT_ORDINAL: AtomicUsize = AtomicUsize::new(0);

/// Handle to an accelerator instance.
///
/// Cloning is cheap; all clones share the same kernel pool and memory
/// accounting. Buffers and streams keep the instance alive.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

pub(crate) struct DeviceInner {
    ordinal: usize,
    config: DeviceConfig,
    pool: rayon::ThreadPool,
    in_use: AtomicUsize,
    #[cfg(feature = "fault-injection")]
    pub(crate) faults: crate::fault::FaultPlan,
}

impl Device {
    /// Bring up a device with its own kernel pool.
    pub fn new(config: DeviceConfig) -> Result<Self, DeviceError> {
        config.validate()?;
        let ordinal = NEXT_ORDINAL.fetch_add(1, Ordering::Relaxed);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.kernel_threads)
            .thread_name(move |i| format!("lanes-dev{ordinal}-k{i}"))
            .build()
            .map_err(|e| DeviceError::Init(e.to_string()))?;

        info!(
            ordinal,
            kernel_threads = pool.current_num_threads(),
            memory_limit = ?config.memory_limit,
            "accelerator ready"
        );

        Ok(Self {
            inner: Arc::new(DeviceInner {
                ordinal,
                config,
                pool,
                in_use: AtomicUsize::new(0),
                #[cfg(feature = "fault-injection")]
                faults: crate::fault::FaultPlan::default(),
            }),
        })
    }

    /// Process-wide device built from [`DeviceConfig::from_env`] on first use.
    pub fn shared() -> Result<Self, DeviceError> {
        static SHARED: OnceLock<Result<Device, DeviceError>> = OnceLock::new();
        SHARED
            .get_or_init(|| Self::new(DeviceConfig::from_env()))
            .clone()
    }

    #[inline]
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.inner.ordinal
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.inner.config
    }

    /// Worker threads available to kernels.
    #[must_use]
    pub fn kernel_threads(&self) -> usize {
        self.inner.pool.current_num_threads()
    }

    /// Bytes held by live buffers.
    #[must_use]
    pub fn memory_in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Allocate `len` zero-initialized elements of device memory.
    pub fn alloc<T>(&self, len: usize) -> Result<DeviceBuffer<T>, DeviceError>
    where
        T: Copy + Default + Send + 'static,
    {
        let bytes = len
            .checked_mul(size_of::<T>())
            .ok_or(DeviceError::OutOfMemory {
                requested: usize::MAX,
                available: self.available(),
            })?;

        #[cfg(feature = "fault-injection")]
        if self.inner.faults.trip(crate::Fault::Alloc) {
            return Err(DeviceError::OutOfMemory {
                requested: bytes,
                available: 0,
            });
        }

        self.inner.reserve(bytes)?;
        debug!(
            ordinal = self.inner.ordinal,
            bytes,
            in_use = self.memory_in_use(),
            "device alloc"
        );
        Ok(DeviceBuffer::new(Arc::clone(&self.inner), len, bytes))
    }

    /// Open a new in-order command stream.
    pub fn create_stream(&self) -> Result<Stream, DeviceError> {
        Stream::spawn(self.clone())
    }

    /// Arm a one-shot failure that fires on the `after`-th following
    /// operation of that kind (`0` = the next one).
    #[cfg(feature = "fault-injection")]
    pub fn inject_fault(&self, fault: crate::Fault, after: usize) {
        self.inner.faults.arm(fault, after);
    }

    pub(crate) fn inner(&self) -> &Arc<DeviceInner> {
        &self.inner
    }

    fn available(&self) -> usize {
        self.inner.available()
    }
}

impl core::fmt::Debug for Device {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Device")
            .field("ordinal", &self.inner.ordinal)
            .field("config", &self.inner.config)
            .field("memory_in_use", &self.memory_in_use())
            .finish()
    }
}

impl DeviceInner {
    pub(crate) fn pool(&self) -> &rayon::ThreadPool {
        &self.pool
    }

    fn available(&self) -> usize {
        match self.config.memory_limit {
            Some(limit) => limit.saturating_sub(self.in_use.load(Ordering::Acquire)),
            None => usize::MAX,
        }
    }

    fn reserve(&self, bytes: usize) -> Result<(), DeviceError> {
        let Some(limit) = self.config.memory_limit else {
            self.in_use.fetch_add(bytes, Ordering::AcqRel);
            return Ok(());
        };
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(bytes).filter(|&total| total <= limit)
            })
            .map(|_| ())
            .map_err(|used| DeviceError::OutOfMemory {
                requested: bytes,
                available: limit.saturating_sub(used),
            })
    }

    pub(crate) fn release(&self, bytes: usize) {
        self.in_use.fetch_sub(bytes, Ordering::AcqRel);
        debug!(ordinal = self.ordinal, bytes, "device release");
    }
}
