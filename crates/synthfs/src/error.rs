// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define file-level error kinds and their errno mapping.
// Author: Lukas Bower

use thiserror::Error;

/// Errno values reported by [`FsError::errno`].
pub mod errno {
    /// Operation interrupted by a signal.
    pub const EINTR: i32 = 4;
    /// No such file or directory.
    pub const ENOENT: i32 = 2;
    /// Bad file descriptor.
    pub const EBADF: i32 = 9;
    /// Out of memory.
    pub const ENOMEM: i32 = 12;
    /// Permission denied.
    pub const EACCES: i32 = 13;
    /// Bad address during a user copy.
    pub const EFAULT: i32 = 14;
    /// File exists.
    pub const EEXIST: i32 = 17;
    /// No such device (exposure mechanism unavailable).
    pub const ENODEV: i32 = 19;
    /// Invalid argument.
    pub const EINVAL: i32 = 22;
    /// Illegal seek.
    pub const ESPIPE: i32 = 29;
}

/// Errors surfaced by synthetic file operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Malformed request: zero-length or repositioned write, out-of-range
    /// offset, read without bound content, bad name.
    #[error("invalid argument")]
    InvalidArgument,
    /// The provider could not produce the state a session needs.
    #[error("provider produced no state for this session")]
    InvalidState,
    /// An allocation failed.
    #[error("out of memory")]
    OutOfMemory,
    /// Copying to or from the caller's buffer failed part way.
    #[error("i/o error while copying across the caller boundary")]
    Io,
    /// A blocking wait was interrupted by a pending signal.
    #[error("interrupted")]
    Interrupted,
    /// The operation or the exposure mechanism is not available.
    #[error("operation not supported")]
    Unsupported,
    /// The requested node or backing state does not exist.
    #[error("not found")]
    NotFound,
    /// A node with the same name already exists under the parent.
    #[error("already exists")]
    AlreadyExists,
    /// The file mode forbids the requested access.
    #[error("permission denied")]
    PermissionDenied,
    /// The handle was not opened for the requested direction.
    #[error("bad file descriptor")]
    BadDescriptor,
    /// Repositioning a non-seekable file.
    #[error("illegal seek")]
    IllegalSeek,
}

impl FsError {
    /// Return the platform error code conventionally used for this kind.
    #[must_use]
    pub fn errno(self) -> i32 {
        match self {
            FsError::InvalidArgument | FsError::InvalidState => errno::EINVAL,
            FsError::OutOfMemory => errno::ENOMEM,
            FsError::Io => errno::EFAULT,
            FsError::Interrupted => errno::EINTR,
            FsError::Unsupported => errno::ENODEV,
            FsError::NotFound => errno::ENOENT,
            FsError::AlreadyExists => errno::EEXIST,
            FsError::PermissionDenied => errno::EACCES,
            FsError::BadDescriptor => errno::EBADF,
            FsError::IllegalSeek => errno::ESPIPE,
        }
    }

    /// Return the negated errno, as returned by a syscall-style entry point.
    #[must_use]
    pub fn as_return_code(self) -> isize {
        -(self.errno() as isize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping_matches_platform_codes() {
        assert_eq!(FsError::InvalidArgument.errno(), 22);
        assert_eq!(FsError::InvalidState.errno(), 22);
        assert_eq!(FsError::OutOfMemory.errno(), 12);
        assert_eq!(FsError::Interrupted.errno(), 4);
        assert_eq!(FsError::Io.as_return_code(), -14);
    }
}
