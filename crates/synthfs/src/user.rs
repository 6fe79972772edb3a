// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Model caller-owned buffers crossed by copy_to_user/copy_from_user.
// Author: Lukas Bower

use thiserror::Error;

/// A copy across the caller boundary touched memory it may not access.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("user copy faulted at byte {at}")]
pub struct CopyFault {
    /// Offset into the caller buffer where the copy stopped.
    pub at: usize,
}

/// Destination buffer owned by the reader.
pub trait UserBuffer {
    /// Number of bytes the caller made addressable.
    fn capacity(&self) -> usize;

    /// Copy `src` into the buffer starting at `at`.
    fn copy_to_user(&mut self, at: usize, src: &[u8]) -> Result<(), CopyFault>;
}

/// Source buffer owned by the writer.
pub trait UserData {
    /// Number of bytes the caller asked to write.
    fn len(&self) -> usize;

    /// Whether the write carries no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the first `dst.len()` bytes of the caller buffer into `dst`.
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault>;
}

impl UserBuffer for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_to_user(&mut self, at: usize, src: &[u8]) -> Result<(), CopyFault> {
        let end = at.checked_add(src.len()).ok_or(CopyFault { at })?;
        if end > self.len() {
            return Err(CopyFault {
                at: self.len().min(at),
            });
        }
        self[at..end].copy_from_slice(src);
        Ok(())
    }
}

impl UserBuffer for Vec<u8> {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_to_user(&mut self, at: usize, src: &[u8]) -> Result<(), CopyFault> {
        self.as_mut_slice().copy_to_user(at, src)
    }
}

impl UserBuffer for &mut [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_to_user(&mut self, at: usize, src: &[u8]) -> Result<(), CopyFault> {
        (**self).copy_to_user(at, src)
    }
}

impl UserData for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        if dst.len() > <[u8]>::len(self) {
            return Err(CopyFault {
                at: <[u8]>::len(self),
            });
        }
        dst.copy_from_slice(&self[..dst.len()]);
        Ok(())
    }
}

impl UserData for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        (**self).copy_from_user(dst)
    }
}

impl UserData for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        self.as_slice().copy_from_user(dst)
    }
}

/// Reader buffer whose addressable window ends at `fault_at`.
///
/// Copies landing past the window fail, which lets hosts exercise the
/// partial-copy error path of a provider.
#[derive(Debug, Clone)]
pub struct FaultingBuffer {
    bytes: Vec<u8>,
    fault_at: usize,
}

impl FaultingBuffer {
    /// Create a buffer of `len` bytes of which only `fault_at` are addressable.
    #[must_use]
    pub fn new(len: usize, fault_at: usize) -> Self {
        Self {
            bytes: vec![0; len],
            fault_at: fault_at.min(len),
        }
    }

    /// Bytes copied so far.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl UserBuffer for FaultingBuffer {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn copy_to_user(&mut self, at: usize, src: &[u8]) -> Result<(), CopyFault> {
        let end = at.saturating_add(src.len());
        if end > self.fault_at {
            return Err(CopyFault {
                at: self.fault_at.min(at),
            });
        }
        self.bytes[at..end].copy_from_slice(src);
        Ok(())
    }
}

/// Writer buffer that claims `len` bytes but faults on every copy.
#[derive(Debug, Clone, Copy)]
pub struct FaultingData {
    len: usize,
}

impl FaultingData {
    /// Create a writer buffer advertising `len` bytes.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl UserData for FaultingData {
    fn len(&self) -> usize {
        self.len
    }

    fn copy_from_user(&self, _dst: &mut [u8]) -> Result<(), CopyFault> {
        Err(CopyFault { at: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_copy_respects_bounds() {
        let mut buf = [0u8; 4];
        buf.copy_to_user(1, b"ab").expect("copy");
        assert_eq!(&buf, b"\0ab\0");
        assert_eq!(buf.copy_to_user(3, b"xy"), Err(CopyFault { at: 3 }));
    }

    #[test]
    fn faulting_buffer_stops_at_window() {
        let mut buf = FaultingBuffer::new(8, 2);
        buf.copy_to_user(0, b"ab").expect("inside window");
        assert!(buf.copy_to_user(2, b"c").is_err());
        assert_eq!(&buf.bytes()[..2], b"ab");
    }
}
