// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define lifecycle errors reported by diagnostic channels.
// Author: Lukas Bower

use synthfs::FsError;
use thiserror::Error;

/// Failure while bringing a diagnostic channel up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The output buffer could not be allocated.
    #[error("failed to allocate output buffer: {0}")]
    Buffer(FsError),
    /// The host has no exposure mechanism.
    #[error("exposure mechanism is not supported on this host")]
    Unsupported,
    /// The channel directory could not be created.
    #[error("failed to create directory '{name}': {source}")]
    Directory {
        /// Requested directory name.
        name: String,
        /// Underlying failure.
        source: FsError,
    },
    /// A channel file could not be created.
    #[error("failed to create file '{name}': {source}")]
    File {
        /// Requested file name.
        name: String,
        /// Underlying failure.
        source: FsError,
    },
}

impl ChannelError {
    /// File-level kind reported to callers that speak errno. Only a missing
    /// exposure mechanism reports [`FsError::Unsupported`]; a directory that
    /// cannot be created is an invalid request.
    #[must_use]
    pub fn kind(&self) -> FsError {
        match self {
            Self::Buffer(kind) => *kind,
            Self::Unsupported => FsError::Unsupported,
            Self::Directory { .. } => FsError::InvalidArgument,
            Self::File { source, .. } => *source,
        }
    }
}
