// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Expose synthetic, debugfs-style files backed by in-process providers.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Synthetic file tree for diagnostic providers.
//!
//! Providers register directories and files through the [`Exposure`] trait and
//! attach a [`FileOps`] table to every file. Opening a file yields a
//! [`FileHandle`] that behaves like a file descriptor: sequential reads and
//! writes drive the provider's [`OpenFile`] session, and dropping the handle
//! releases it.
//!
//! [`SyntheticFs`] is the in-memory implementation used by hosts and tests.

mod error;
mod flags;
mod handle;
mod ops;
mod signal;
mod tree;
mod user;

pub use error::{errno, FsError};
pub use flags::{Mode, OpenFlags};
pub use handle::FileHandle;
pub use ops::{Exposure, FileOps, NodeId, OpenFile};
pub use signal::Signal;
pub use tree::SyntheticFs;
pub use user::{CopyFault, FaultingBuffer, FaultingData, UserBuffer, UserData};
