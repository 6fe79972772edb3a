// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Expose diagnostic output buffers and command files over a synthetic tree.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Diagnostic output channels.
//!
//! Producers print formatted text into an [`OutputBuffer`]; readers consume it
//! through a read-only file bound into a [`synthfs`] tree. A
//! [`CommandFile`] turns a single write into a command and streams the
//! resulting answer back to readers. [`DebugChannel`] wires a buffer, its
//! directory and the optional `ctl`/`stats` files together and tears them
//! down again.
//!
//! ```no_run
//! use std::sync::Arc;
//! use diagchan::{ChannelConfig, DebugChannel};
//! use synthfs::{OpenFlags, SyntheticFs};
//!
//! let fs = Arc::new(SyntheticFs::new());
//! let channel = DebugChannel::init(fs.clone(), &ChannelConfig::default()).unwrap();
//! channel.buffer().append_string("hello\n");
//! let mut file = fs.open("diagchan/output", OpenFlags::READ).unwrap();
//! assert_eq!(file.read_to_end(64).unwrap(), b"hello\n");
//! ```

pub mod buffer;
pub mod channel;
pub mod config;
pub mod control;
pub mod error;
mod readonly;
pub mod stack;
pub mod sync;

pub use buffer::{BufferLimits, BufferStats, OutputBuffer, Printer, U64Format, DEFAULT_BASELINE};
pub use channel::{ControlState, DebugChannel};
pub use config::{ChannelConfig, ConfigError};
pub use control::{
    AnswerHandle, AnswerSlot, CommandFile, CommandHandler, StateProvider, DEFAULT_MAX_COMMAND_LEN,
};
pub use error::ChannelError;
pub use stack::{StackSource, StackTrace};
pub use sync::{Interrupted, KillableGuard, KillableMutex};
