// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Serve an output buffer as a sequential read-only synthetic file.
// Author: Lukas Bower

use log::debug;
use synthfs::{FileOps, FsError, NodeId, OpenFile, OpenFlags, Signal, UserBuffer};

use crate::buffer::OutputBuffer;

/// File operations exposing an [`OutputBuffer`].
#[derive(Debug)]
pub(crate) struct BufferFile {
    buffer: OutputBuffer,
}

impl BufferFile {
    pub(crate) fn new(buffer: OutputBuffer) -> Self {
        Self { buffer }
    }
}

impl FileOps for BufferFile {
    fn open(&self, node: NodeId, flags: OpenFlags) -> Result<Box<dyn OpenFile>, FsError> {
        if flags.contains(OpenFlags::WRITE) {
            return Err(FsError::PermissionDenied);
        }
        debug!("buffer file {} opened", node);
        Ok(Box::new(BufferReader {
            buffer: Some(self.buffer.clone()),
        }))
    }
}

/// One reader of a bound buffer. The stream length is the data length at the
/// time of each read; no terminator is exposed.
struct BufferReader {
    buffer: Option<OutputBuffer>,
}

impl OpenFile for BufferReader {
    fn read(
        &mut self,
        signal: &Signal,
        buf: &mut dyn UserBuffer,
        count: usize,
        pos: &mut i64,
    ) -> Result<usize, FsError> {
        let buffer = self.buffer.as_ref().ok_or(FsError::InvalidState)?;
        let store = buffer.lock_killable(signal)?;
        let data = store.as_bytes();
        let offset = usize::try_from(*pos).map_err(|_| FsError::InvalidArgument)?;
        if offset > data.len() {
            return Err(FsError::InvalidArgument);
        }
        if count == 0 || offset == data.len() {
            return Ok(0);
        }
        let n = count.min(data.len() - offset);
        buf.copy_to_user(0, &data[offset..offset + n])
            .map_err(|_| FsError::Io)?;
        *pos += n as i64;
        Ok(n)
    }

    fn release(&mut self) {
        self.buffer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferLimits;
    use synthfs::FaultingBuffer;

    fn reader(text: &str) -> (OutputBuffer, Box<dyn OpenFile>) {
        let buffer = OutputBuffer::with_limits(BufferLimits {
            baseline: 4,
            max_capacity: None,
        })
        .expect("buffer");
        buffer.append_string(text);
        let file = BufferFile::new(buffer.clone())
            .open(NodeId::from_raw(1), OpenFlags::READ)
            .expect("open");
        (buffer, file)
    }

    #[test]
    fn bounded_reads_walk_the_data() {
        let (_buffer, mut file) = reader("abcdef");
        let mut pos = 0i64;
        let mut chunk = [0u8; 4];
        let signal = Signal::none();
        assert_eq!(file.read(&signal, &mut &mut chunk[..], 4, &mut pos), Ok(4));
        assert_eq!(&chunk, b"abcd");
        assert_eq!(file.read(&signal, &mut &mut chunk[..], 4, &mut pos), Ok(2));
        assert_eq!(&chunk[..2], b"ef");
        assert_eq!(file.read(&signal, &mut &mut chunk[..], 4, &mut pos), Ok(0));
    }

    #[test]
    fn out_of_range_offsets_are_rejected() {
        let (_buffer, mut file) = reader("abc");
        let signal = Signal::none();
        let mut chunk = [0u8; 4];
        let mut pos = 4i64;
        assert_eq!(
            file.read(&signal, &mut &mut chunk[..], 4, &mut pos),
            Err(FsError::InvalidArgument)
        );
        let mut pos = -1i64;
        assert_eq!(
            file.read(&signal, &mut &mut chunk[..], 4, &mut pos),
            Err(FsError::InvalidArgument)
        );
        let mut pos = 1i64;
        assert_eq!(file.read(&signal, &mut &mut chunk[..], 0, &mut pos), Ok(0));
    }

    #[test]
    fn write_open_is_refused() {
        let buffer = OutputBuffer::new().expect("buffer");
        let result = BufferFile::new(buffer).open(NodeId::from_raw(1), OpenFlags::READ_WRITE);
        assert_eq!(result.err(), Some(FsError::PermissionDenied));
    }

    #[test]
    fn faulting_copy_reports_io() {
        let (_buffer, mut file) = reader("abcdef");
        let mut pos = 0i64;
        let mut target = FaultingBuffer::new(4, 2);
        assert_eq!(
            file.read(&Signal::none(), &mut target, 4, &mut pos),
            Err(FsError::Io)
        );
        assert_eq!(pos, 0);
    }

    #[test]
    fn pending_signal_interrupts_read() {
        let (_buffer, mut file) = reader("abc");
        let signal = Signal::new();
        signal.raise();
        let mut chunk = [0u8; 4];
        let mut pos = 0i64;
        assert_eq!(
            file.read(&signal, &mut &mut chunk[..], 4, &mut pos),
            Err(FsError::Interrupted)
        );
    }
}
