use std::{
    ops::Range,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, OnceLock,
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread::JoinHandle,
};

use tracing::{trace, warn};

use crate::{
    Device, DeviceBuffer, DeviceError, Kernel, StagingBuffer,
    device::DeviceInner,
    memory::lock,
};

type Command = Box<dyn FnOnce(&DeviceInner) -> Result<(), DeviceError> + Send>;

static NEXT_STREAM: AtomicUsize = AtomicUsize::new(0);

/// In-order command queue executed by a dedicated worker.
///
/// Commands run strictly in submission order. The first failing command
/// marks the stream faulted: everything queued behind it is discarded and
/// every later call reports that first error.
pub struct Stream {
    id: usize,
    queue: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    fault: Arc<OnceLock<DeviceError>>,
    device: Device,
}

impl Stream {
    pub(crate) fn spawn(device: Device) -> Result<Self, DeviceError> {
        let id = NEXT_STREAM.fetch_add(1, Ordering::Relaxed);
        let (queue, commands) = mpsc::channel::<Command>();
        let fault = Arc::new(OnceLock::new());

        let inner = Arc::clone(device.inner());
        let worker_fault = Arc::clone(&fault);
        let worker = std::thread::Builder::new()
            .name(format!("lanes-stream{id}"))
            .spawn(move || run(id, &inner, &commands, &worker_fault))
            .map_err(|e| DeviceError::Init(e.to_string()))?;

        trace!(stream = id, ordinal = device.ordinal(), "stream created");
        Ok(Self {
            id,
            queue: Some(queue),
            worker: Some(worker),
            fault,
            device,
        })
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// First error the stream hit, if any. Does not wait.
    pub fn status(&self) -> Result<(), DeviceError> {
        match self.fault.get() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Queue a copy of the filled part of `src` into `dst[offset..]`.
    /// The staging buffer returns to its ring once copied.
    pub fn upload(
        &self, dst: &DeviceBuffer<u8>, offset: usize, src: StagingBuffer,
    ) -> Result<(), DeviceError> {
        let len = src.filled();
        check_range(offset..offset.saturating_add(len), dst.len(), "upload")?;
        let storage = dst.storage();
        self.enqueue(move |_device| {
            #[cfg(feature = "fault-injection")]
            if _device.faults.trip(crate::Fault::Upload) {
                return Err(DeviceError::Transfer("injected upload failure".into()));
            }
            let mut mem = lock(&storage, "upload")?;
            mem[offset..offset + len].copy_from_slice(src.as_filled());
            Ok(())
        })
    }

    /// Queue a fill of every element of `dst` with `value`.
    pub fn fill<T>(&self, dst: &DeviceBuffer<T>, value: T) -> Result<(), DeviceError>
    where
        T: Copy + Send + 'static,
    {
        let storage = dst.storage();
        self.enqueue(move |_| {
            lock(&storage, "fill")?.fill(value);
            Ok(())
        })
    }

    /// Queue a kernel.
    pub fn launch(&self, kernel: Kernel) -> Result<(), DeviceError> {
        let stream = self.id;
        self.enqueue(move |device| {
            #[cfg(feature = "fault-injection")]
            if device.faults.trip(crate::Fault::Launch) {
                return Err(DeviceError::Launch {
                    kernel: kernel.name(),
                    reason: "injected launch failure".into(),
                });
            }
            trace!(stream, kernel = kernel.name(), "launch");
            kernel.run(device.pool())
        })
    }

    /// Queue a copy of `src[range]` back to the host.
    pub fn download<T>(
        &self, src: &DeviceBuffer<T>, range: Range<usize>,
    ) -> Result<Download<T>, DeviceError>
    where
        T: Copy + Send + 'static,
    {
        check_range(range.clone(), src.len(), "download")?;
        let storage = src.storage();
        let (tx, rx) = mpsc::sync_channel(1);
        self.enqueue(move |_| {
            let mem = lock(&storage, "download")?;
            // Receiver dropped means nobody wants the data anymore.
            let _ = tx.send(mem[range].to_vec());
            Ok(())
        })?;
        Ok(Download {
            rx,
            fault: Arc::clone(&self.fault),
        })
    }

    /// Wait for every queued command to finish.
    pub fn synchronize(&self) -> Result<(), DeviceError> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.enqueue(move |_| {
            let _ = tx.send(());
            Ok(())
        })?;
        let fenced = rx.recv();
        self.status()?;
        fenced.map_err(|_| DeviceError::StreamClosed)
    }

    fn enqueue<F>(&self, command: F) -> Result<(), DeviceError>
    where
        F: FnOnce(&DeviceInner) -> Result<(), DeviceError> + Send + 'static,
    {
        self.status()?;
        self.queue
            .as_ref()
            .ok_or(DeviceError::StreamClosed)?
            .send(Box::new(command))
            .map_err(|_| DeviceError::StreamClosed)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        // Closing the queue lets the worker drain and exit.
        drop(self.queue.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl core::fmt::Debug for Stream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("fault", &self.fault.get())
            .finish()
    }
}

/// Pending device-to-host copy.
#[must_use = "a download does nothing unless waited on"]
pub struct Download<T> {
    rx: Receiver<Vec<T>>,
    fault: Arc<OnceLock<DeviceError>>,
}

impl<T> Download<T> {
    /// Block until the copy has run.
    pub fn wait(self) -> Result<Vec<T>, DeviceError> {
        self.rx
            .recv()
            .map_err(|_| self.fault.get().cloned().unwrap_or(DeviceError::StreamClosed))
    }
}

fn run(
    id: usize, device: &DeviceInner, commands: &Receiver<Command>, fault: &OnceLock<DeviceError>,
) {
    for command in commands {
        if fault.get().is_some() {
            continue;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| command(device)))
            .unwrap_or_else(|_| {
                Err(DeviceError::Launch {
                    kernel: "stream",
                    reason: "command panicked".into(),
                })
            });
        if let Err(err) = outcome {
            warn!(stream = id, error = %err, "stream faulted");
            let _ = fault.set(err);
        }
    }
    trace!(stream = id, "stream closed");
}

fn check_range(range: Range<usize>, len: usize, what: &str) -> Result<(), DeviceError> {
    if range.start > range.end || range.end > len {
        return Err(DeviceError::Transfer(format!(
            "{what} range {}..{} outside buffer of {len}",
            range.start, range.end
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceConfig, StagingRing};

    fn device() -> Device {
        Device::new(DeviceConfig::default().with_kernel_threads(2)).unwrap()
    }

    #[test]
    fn upload_then_download_round_trips() {
        let device = device();
        let stream = device.create_stream().unwrap();
        let ring = StagingRing::new(2, 8);
        let buf = device.alloc::<u8>(12).unwrap();

        let mut staged = ring.acquire().unwrap();
        staged.extend_from(b"lanes");
        stream.upload(&buf, 4, staged).unwrap();
        let bytes = stream.download(&buf, 0..12).unwrap().wait().unwrap();
        assert_eq!(&bytes, b"\0\0\0\0lanes\0\0\0");
    }

    #[test]
    fn out_of_bounds_transfer_is_refused_up_front() {
        let device = device();
        let stream = device.create_stream().unwrap();
        let ring = StagingRing::new(2, 8);
        let buf = device.alloc::<u8>(4).unwrap();

        let mut staged = ring.acquire().unwrap();
        staged.extend_from(b"toolong");
        assert!(matches!(
            stream.upload(&buf, 0, staged),
            Err(DeviceError::Transfer(_))
        ));
        assert!(stream.download(&buf, 2..5).is_err());
        assert_eq!(stream.status(), Ok(()));
    }

    #[test]
    fn commands_run_in_submission_order() {
        let device = device();
        let stream = device.create_stream().unwrap();
        let buf = device.alloc::<u32>(3).unwrap();
        stream.fill(&buf, 1).unwrap();
        let first = stream.download(&buf, 0..3).unwrap();
        stream.fill(&buf, 2).unwrap();
        let second = stream.download(&buf, 0..3).unwrap();
        assert_eq!(second.wait().unwrap(), [2, 2, 2]);
        assert_eq!(first.wait().unwrap(), [1, 1, 1]);
    }

    #[test]
    fn failure_is_sticky() {
        let device = device();
        let stream = device.create_stream().unwrap();
        let buf = device.alloc::<u8>(4).unwrap();
        stream
            .enqueue(|_| {
                Err(DeviceError::Launch {
                    kernel: "broken",
                    reason: "test".into(),
                })
            })
            .unwrap();
        let err = stream.synchronize().unwrap_err();
        assert!(matches!(err, DeviceError::Launch { kernel: "broken", .. }));
        assert_eq!(stream.fill(&buf, 0), Err(err.clone()));
        assert_eq!(stream.status(), Err(err));
    }

    #[test]
    fn panicking_command_faults_the_stream() {
        let device = device();
        let stream = device.create_stream().unwrap();
        stream.enqueue(|_| panic!("kernel bug")).unwrap();
        assert!(matches!(
            stream.synchronize(),
            Err(DeviceError::Launch { kernel: "stream", .. })
        ));
    }

    #[test]
    fn discarded_download_reports_the_fault() {
        let device = device();
        let stream = device.create_stream().unwrap();
        let buf = device.alloc::<u8>(4).unwrap();
        let (release, gate) = mpsc::channel::<()>();
        stream
            .enqueue(move |_| {
                let _ = gate.recv();
                Err(DeviceError::Transfer("late".into()))
            })
            .unwrap();
        let pending = stream.download(&buf, 0..4).unwrap();
        release.send(()).unwrap();
        assert_eq!(
            pending.wait(),
            Err(DeviceError::Transfer("late".into()))
        );
    }
}
