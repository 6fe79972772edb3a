// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Tie an output buffer to its exposed directory and files.
// Author: Lukas Bower

//! Diagnostic channel lifecycle.
//!
//! A channel owns one [`OutputBuffer`] and the nodes exposing it:
//!
//! ```text
//! <dir_name>/
//!     <output_name>   read-only buffer contents
//!     ctl             reset | mark <text> | status
//!     stats           capacity=<n>\nused=<n>\n
//! ```

use std::sync::Arc;

use log::{debug, error, info};
use synthfs::{Exposure, FsError, Mode, NodeId, Signal};

use crate::buffer::OutputBuffer;
use crate::config::ChannelConfig;
use crate::control::{AnswerHandle, AnswerSlot, CommandFile};
use crate::error::ChannelError;

/// Answer of a successful `reset`.
pub const ANSWER_RESET: &str = "done";
/// Answer of a successful `mark`.
pub const ANSWER_MARK: &str = "marked";
/// Answer left behind by an unrecognised command.
pub const ANSWER_UNKNOWN: &str = "error: unknown command";

/// Durable state of a channel's control file.
#[derive(Debug)]
pub struct ControlState {
    buffer: OutputBuffer,
    answer: Arc<AnswerSlot>,
}

impl ControlState {
    fn new(buffer: OutputBuffer) -> Self {
        Self {
            buffer,
            answer: Arc::new(AnswerSlot::default()),
        }
    }

    /// Answer slot shared with reading sessions.
    #[must_use]
    pub fn answer(&self) -> &Arc<AnswerSlot> {
        &self.answer
    }

    /// Run one control command. `reset` waits for the buffer lock until
    /// `signal` is pending.
    pub fn execute(&self, command: &str, signal: &Signal) -> Result<(), FsError> {
        let (verb, rest) = match command.split_once(' ') {
            Some((verb, rest)) => (verb, Some(rest)),
            None => (command, None),
        };
        match (verb, rest) {
            ("reset", None) => {
                self.buffer.reset(signal)?;
                self.answer.set(ANSWER_RESET);
            }
            ("mark", Some(text)) => {
                self.buffer.append_string(&format!("{text}\n"));
                self.answer.set(ANSWER_MARK);
            }
            ("status", None) => {
                let stats = self.buffer.stats();
                self.answer
                    .set(format!("capacity={} used={}", stats.capacity, stats.used));
            }
            _ => {
                error!("unknown control command '{}'", command);
                self.answer.set(ANSWER_UNKNOWN);
                return Err(FsError::InvalidArgument);
            }
        }
        Ok(())
    }
}

/// A diagnostic output buffer and the files exposing it.
pub struct DebugChannel {
    exposure: Arc<dyn Exposure>,
    buffer: OutputBuffer,
    dir: Option<NodeId>,
    files: Vec<NodeId>,
    output: Option<NodeId>,
    control: Option<NodeId>,
    stats: Option<NodeId>,
}

impl std::fmt::Debug for DebugChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugChannel")
            .field("buffer", &self.buffer)
            .field("dir", &self.dir)
            .field("output", &self.output)
            .field("control", &self.control)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Nodes created so far during [`DebugChannel::init`], removed in reverse
/// order when a later step fails.
struct Unwind<'a> {
    exposure: &'a dyn Exposure,
    created: Vec<NodeId>,
}

impl Unwind<'_> {
    fn push(&mut self, node: NodeId) -> NodeId {
        self.created.push(node);
        node
    }

    fn rollback(self) {
        for node in self.created.into_iter().rev() {
            self.exposure.remove(node);
        }
    }
}

impl DebugChannel {
    /// Allocate the buffer and expose it as configured.
    pub fn init(exposure: Arc<dyn Exposure>, config: &ChannelConfig) -> Result<Self, ChannelError> {
        let buffer = OutputBuffer::with_limits(config.limits()).map_err(|err| {
            error!("cannot create output buffer: {}", err);
            ChannelError::Buffer(err)
        })?;

        let mut unwind = Unwind {
            exposure: exposure.as_ref(),
            created: Vec::new(),
        };
        match Self::expose(&mut unwind, &buffer, config) {
            Ok((dir, output, control, stats)) => {
                let files = unwind.created[1..].to_vec();
                info!("diagnostic channel '{}' ready", config.dir_name);
                drop(unwind);
                Ok(Self {
                    exposure,
                    buffer,
                    dir: Some(dir),
                    files,
                    output: Some(output),
                    control,
                    stats,
                })
            }
            Err(err) => {
                error!("diagnostic channel '{}' failed: {}", config.dir_name, err);
                unwind.rollback();
                buffer.destroy();
                Err(err)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn expose(
        unwind: &mut Unwind<'_>,
        buffer: &OutputBuffer,
        config: &ChannelConfig,
    ) -> Result<(NodeId, NodeId, Option<NodeId>, Option<NodeId>), ChannelError> {
        let exposure = unwind.exposure;
        let dir = exposure
            .create_dir(&config.dir_name, None)
            .map_err(|err| match err {
                FsError::Unsupported => ChannelError::Unsupported,
                source => ChannelError::Directory {
                    name: config.dir_name.clone(),
                    source,
                },
            })?;
        unwind.push(dir);

        let file_error = |name: &str| {
            let name = name.to_owned();
            move |source| ChannelError::File { name, source }
        };

        let output = buffer
            .bind_to_readonly_file(exposure, &config.output_name, Some(dir))
            .map_err(file_error(config.output_name.as_str()))?;
        unwind.push(output);

        let control = match &config.control_name {
            Some(name) => {
                let state = ControlState::new(buffer.clone());
                let node = CommandFile::new(Arc::new(state))
                    .with_handler(|command: &str, state: &ControlState, signal: &Signal| {
                        state.execute(command, signal)
                    })
                    .with_provider(|state: &ControlState| Some(AnswerHandle::shared(state.answer())))
                    .with_max_command_len(config.max_command_len)
                    .create(exposure, name, Mode::CONTROL, Some(dir))
                    .map_err(file_error(name.as_str()))?;
                Some(unwind.push(node))
            }
            None => None,
        };

        let stats = match &config.stats_name {
            Some(name) => {
                let node = CommandFile::new(Arc::new(buffer.clone()))
                    .with_provider(|buffer: &OutputBuffer| {
                        let stats = buffer.stats();
                        Some(AnswerHandle::owned(format!(
                            "capacity={}\nused={}\n",
                            stats.capacity, stats.used
                        )))
                    })
                    .create(exposure, name, Mode::READ_ALL, Some(dir))
                    .map_err(file_error(name.as_str()))?;
                Some(unwind.push(node))
            }
            None => None,
        };

        Ok((dir, output, control, stats))
    }

    /// Remove the files, then the directory, then release the buffer.
    /// Calling it again does nothing.
    pub fn fini(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        for node in self.files.drain(..).rev() {
            self.exposure.remove(node);
        }
        self.exposure.remove(dir);
        self.buffer.destroy();
        self.output = None;
        self.control = None;
        self.stats = None;
        debug!("diagnostic channel torn down");
    }

    /// Forget the buffered output. Callers guarantee no producer or reader is
    /// active.
    pub fn clear(&self) {
        self.buffer.clear();
    }

    /// Buffer producers print into.
    #[must_use]
    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    /// Channel directory, until [`DebugChannel::fini`].
    #[must_use]
    pub fn dir(&self) -> Option<NodeId> {
        self.dir
    }

    /// Read-only output file.
    #[must_use]
    pub fn output(&self) -> Option<NodeId> {
        self.output
    }

    /// Control file, when configured.
    #[must_use]
    pub fn control(&self) -> Option<NodeId> {
        self.control
    }

    /// Stats file, when configured.
    #[must_use]
    pub fn stats(&self) -> Option<NodeId> {
        self.stats
    }
}

impl Drop for DebugChannel {
    fn drop(&mut self) {
        self.fini();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ControlState {
        ControlState::new(OutputBuffer::new().expect("buffer"))
    }

    #[test]
    fn mark_and_status_update_the_answer() {
        let state = state();
        state.execute("mark boot complete", &Signal::none()).expect("mark");
        assert_eq!(state.answer().get(), ANSWER_MARK);
        assert_eq!(state.buffer.snapshot(), b"boot complete\n");
        state.execute("status", &Signal::none()).expect("status");
        assert_eq!(state.answer().get(), "capacity=1000 used=14");
    }

    #[test]
    fn reset_clears_the_buffer() {
        let state = state();
        state.buffer.append_string("noise");
        state.execute("reset", &Signal::none()).expect("reset");
        assert!(state.buffer.is_empty());
        assert_eq!(state.answer().get(), ANSWER_RESET);
    }

    #[test]
    fn unknown_command_leaves_an_error_answer() {
        let state = state();
        let quiet = Signal::none();
        assert_eq!(state.execute("explode", &quiet), Err(FsError::InvalidArgument));
        assert_eq!(state.execute("reset now", &quiet), Err(FsError::InvalidArgument));
        assert_eq!(state.answer().get(), ANSWER_UNKNOWN);
    }

    #[test]
    fn pending_signal_abandons_reset() {
        let state = state();
        state.buffer.append_string("kept");
        let signal = Signal::new();
        signal.raise();
        assert_eq!(state.execute("reset", &signal), Err(FsError::Interrupted));
        assert_eq!(state.buffer.snapshot(), b"kept");
        assert_eq!(state.answer().get(), "");
    }
}
