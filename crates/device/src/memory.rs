use std::sync::{Arc, Mutex, MutexGuard};

use crate::{DeviceError, device::DeviceInner};

pub(crate) type Storage<T> = Arc<Mutex<Box<[T]>>>;

/// Owned region of device memory.
///
/// Contents are only reachable through stream commands. Dropping the buffer
/// returns its bytes to the device; commands already queued keep the backing
/// storage alive until they run.
pub struct DeviceBuffer<T> {
    storage: Storage<T>,
    len: usize,
    bytes: usize,
    device: Arc<DeviceInner>,
}

impl<T: Copy + Default> DeviceBuffer<T> {
    pub(crate) fn new(device: Arc<DeviceInner>, len: usize, bytes: usize) -> Self {
        Self {
            storage: Arc::new(Mutex::new(vec![T::default(); len].into_boxed_slice())),
            len,
            bytes,
            device,
        }
    }
}

impl<T> DeviceBuffer<T> {
    /// Element count.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size in bytes, as charged against the device.
    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> usize {
        self.bytes
    }

    pub(crate) fn storage(&self) -> Storage<T> {
        Arc::clone(&self.storage)
    }
}

impl<T> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        self.device.release(self.bytes);
    }
}

impl<T> core::fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.len)
            .field("bytes", &self.bytes)
            .finish()
    }
}

pub(crate) fn lock<'a, T>(
    storage: &'a Storage<T>, what: &'static str,
) -> Result<MutexGuard<'a, Box<[T]>>, DeviceError> {
    storage.lock().map_err(|_| DeviceError::Launch {
        kernel: what,
        reason: "device buffer poisoned by an earlier failure".into(),
    })
}
