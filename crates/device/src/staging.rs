//! Reusable host staging buffers.
//!
//! A ring owns a fixed set of equally sized host buffers. [`acquire`] blocks
//! until one is free; a buffer goes back to its ring when it is dropped,
//! which for uploaded buffers happens once the stream has copied it. The
//! depth of the ring therefore bounds how far the host can run ahead of the
//! device.
//!
//! [`acquire`]: StagingRing::acquire

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::trace;

use crate::DeviceError;

pub struct StagingRing {
    free: Receiver<Vec<u8>>,
    home: Sender<Vec<u8>>,
    depth: usize,
    buffer_len: usize,
}

impl StagingRing {
    #[must_use]
    pub fn new(depth: usize, buffer_len: usize) -> Self {
        let (home, free) = mpsc::channel();
        for _ in 0..depth {
            // The receiver is alive in this scope.
            let _ = home.send(vec![0u8; buffer_len]);
        }
        Self {
            free,
            home,
            depth,
            buffer_len,
        }
    }

    /// Take a free buffer, waiting for the stream to hand one back if all
    /// are in flight.
    pub fn acquire(&self) -> Result<StagingBuffer, DeviceError> {
        let data = match self.free.try_recv() {
            Ok(data) => data,
            Err(_) => {
                trace!(depth = self.depth, "staging ring exhausted, waiting");
                self.free.recv().map_err(|_| DeviceError::StreamClosed)?
            }
        };
        Ok(StagingBuffer {
            data,
            filled: 0,
            home: self.home.clone(),
        })
    }
}

impl core::fmt::Debug for StagingRing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StagingRing")
            .field("depth", &self.depth)
            .field("buffer_len", &self.buffer_len)
            .finish()
    }
}

/// Host buffer on loan from a [`StagingRing`].
///
/// Only the first [`filled`](Self::filled) bytes are uploaded.
pub struct StagingBuffer {
    data: Vec<u8>,
    filled: usize,
    home: Sender<Vec<u8>>,
}

impl StagingBuffer {
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub const fn filled(&self) -> usize {
        self.filled
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.filled
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.filled == self.data.len()
    }

    /// Append as much of `data` as fits; returns the count taken.
    pub fn extend_from(&mut self, data: &[u8]) -> usize {
        let n = self.remaining().min(data.len());
        self.data[self.filled..self.filled + n].copy_from_slice(&data[..n]);
        self.filled += n;
        n
    }

    /// Whole buffer for in-place writes; pair with [`set_filled`].
    ///
    /// [`set_filled`]: Self::set_filled
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn set_filled(&mut self, filled: usize) {
        assert!(filled <= self.data.len(), "staging fill past capacity");
        self.filled = filled;
    }

    /// Bytes that an upload will copy.
    #[inline]
    #[must_use]
    pub fn as_filled(&self) -> &[u8] {
        &self.data[..self.filled]
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        // Ring already gone: the allocation is simply freed.
        let _ = self.home.send(data);
    }
}

impl core::fmt::Debug for StagingBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StagingBuffer")
            .field("capacity", &self.capacity())
            .field("filled", &self.filled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_return_on_drop() {
        let ring = StagingRing::new(2, 16);
        let a = ring.acquire().unwrap();
        let b = ring.acquire().unwrap();
        assert!(ring.free.try_recv().is_err());
        drop(a);
        let c = ring.acquire().unwrap();
        assert_eq!(c.capacity(), 16);
        assert_eq!(c.filled(), 0);
        drop((b, c));
    }

    #[test]
    fn extend_stops_at_capacity() {
        let ring = StagingRing::new(2, 8);
        let mut buf = ring.acquire().unwrap();
        assert_eq!(buf.extend_from(b"abcde"), 5);
        assert_eq!(buf.extend_from(b"fghij"), 3);
        assert!(buf.is_full());
        assert_eq!(buf.as_filled(), b"abcdefgh");
        assert_eq!(buf.extend_from(b"k"), 0);
    }

    #[test]
    fn acquire_waits_for_release_from_another_thread() {
        let ring = StagingRing::new(2, 4);
        let a = ring.acquire().unwrap();
        let b = ring.acquire().unwrap();
        let releaser = std::thread::spawn(move || drop((a, b)));
        let c = ring.acquire().unwrap();
        releaser.join().unwrap();
        assert_eq!(c.capacity(), 4);
    }
}
