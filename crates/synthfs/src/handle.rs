// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide a descriptor-like handle over an open synthetic file session.
// Author: Lukas Bower

use std::fmt;

use crate::{FsError, OpenFile, OpenFlags, Signal, UserBuffer, UserData};

/// Descriptor for an open synthetic file.
///
/// The handle owns the provider session and its position. Dropping the handle
/// releases the session.
pub struct FileHandle {
    file: Box<dyn OpenFile>,
    flags: OpenFlags,
    pos: i64,
    signal: Signal,
    live: bool,
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("flags", &self.flags)
            .field("pos", &self.pos)
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

impl FileHandle {
    /// Wrap a provider session opened with `flags`.
    #[must_use]
    pub fn new(file: Box<dyn OpenFile>, flags: OpenFlags, signal: Signal) -> Self {
        Self {
            file,
            flags,
            pos: 0,
            signal,
            live: true,
        }
    }

    /// Current file position.
    #[must_use]
    pub fn position(&self) -> i64 {
        self.pos
    }

    /// Signal observed by blocking waits issued through this handle.
    #[must_use]
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Read into `buf` at the current position.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let count = buf.len();
        let mut view = buf;
        self.read_user(&mut view, count)
    }

    /// Read up to `count` bytes into a caller buffer at the current position.
    pub fn read_user(&mut self, buf: &mut dyn UserBuffer, count: usize) -> Result<usize, FsError> {
        self.require(OpenFlags::READ)?;
        let mut pos = self.pos;
        let read = self.file.read(&self.signal, buf, count, &mut pos)?;
        self.pos = pos;
        Ok(read)
    }

    /// Read at an explicit offset without moving the handle position.
    pub fn pread(&mut self, buf: &mut [u8], offset: i64) -> Result<usize, FsError> {
        self.require(OpenFlags::READ)?;
        let count = buf.len();
        let mut view = buf;
        let mut pos = offset;
        self.file.read(&self.signal, &mut view, count, &mut pos)
    }

    /// Read in `chunk`-sized steps until end of file.
    pub fn read_to_end(&mut self, chunk: usize) -> Result<Vec<u8>, FsError> {
        let mut out = Vec::new();
        let mut scratch = vec![0u8; chunk.max(1)];
        loop {
            let read = self.read(&mut scratch)?;
            if read == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&scratch[..read]);
        }
    }

    /// Write `data` at the current position.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        self.write_user(&data)
    }

    /// Write a caller buffer at the current position.
    pub fn write_user(&mut self, data: &dyn UserData) -> Result<usize, FsError> {
        self.require(OpenFlags::WRITE)?;
        let mut pos = self.pos;
        let written = self.file.write(&self.signal, data, &mut pos)?;
        self.pos = pos;
        Ok(written)
    }

    /// Write at an explicit offset without moving the handle position.
    pub fn pwrite(&mut self, data: &[u8], offset: i64) -> Result<usize, FsError> {
        self.require(OpenFlags::WRITE)?;
        let mut pos = offset;
        self.file.write(&self.signal, &data, &mut pos)
    }

    /// Reposition the handle. Synthetic diagnostic files are not seekable.
    pub fn seek(&mut self, pos: i64) -> Result<i64, FsError> {
        if !self.file.seekable() {
            return Err(FsError::IllegalSeek);
        }
        if pos < 0 {
            return Err(FsError::InvalidArgument);
        }
        self.pos = pos;
        Ok(pos)
    }

    /// Release the session explicitly.
    pub fn close(mut self) {
        self.release();
    }

    fn require(&self, direction: OpenFlags) -> Result<(), FsError> {
        if self.flags.contains(direction) {
            Ok(())
        } else {
            Err(FsError::BadDescriptor)
        }
    }

    fn release(&mut self) {
        if self.live {
            self.live = false;
            self.file.release();
        }
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        self.release();
    }
}
