// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define the provider contract between synthetic files and their backing state.
// Author: Lukas Bower

use std::fmt;
use std::sync::Arc;

use crate::{FsError, Mode, OpenFlags, Signal, UserBuffer, UserData};

/// Stable identity of a node in a synthetic tree.
///
/// Durable per-file state is keyed by this identity, never by an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Per-file operation table attached when a file is created.
pub trait FileOps: Send + Sync {
    /// Start a session on `node`.
    fn open(&self, node: NodeId, flags: OpenFlags) -> Result<Box<dyn OpenFile>, FsError>;
}

/// One open session on a synthetic file.
///
/// The default implementations reject the operation, so read-only providers
/// only implement [`OpenFile::read`].
pub trait OpenFile: Send {
    /// Copy up to `count` bytes at `*pos` into `buf`, advancing `*pos`.
    fn read(
        &mut self,
        _signal: &Signal,
        _buf: &mut dyn UserBuffer,
        _count: usize,
        _pos: &mut i64,
    ) -> Result<usize, FsError> {
        Err(FsError::InvalidArgument)
    }

    /// Consume `data` written at `*pos`.
    fn write(
        &mut self,
        _signal: &Signal,
        _data: &dyn UserData,
        _pos: &mut i64,
    ) -> Result<usize, FsError> {
        Err(FsError::InvalidArgument)
    }

    /// Whether the session accepts repositioning.
    fn seekable(&self) -> bool {
        false
    }

    /// Tear the session down. Called exactly once.
    fn release(&mut self) {}
}

/// Registration primitives of an exposure mechanism.
pub trait Exposure: Send + Sync {
    /// Create a directory under `parent` (the root when `None`).
    fn create_dir(&self, name: &str, parent: Option<NodeId>) -> Result<NodeId, FsError>;

    /// Create a file under `parent` served by `ops`.
    fn create_file(
        &self,
        name: &str,
        mode: Mode,
        parent: Option<NodeId>,
        ops: Arc<dyn FileOps>,
    ) -> Result<NodeId, FsError>;

    /// Remove a node. Unknown nodes are ignored.
    fn remove(&self, node: NodeId);
}
