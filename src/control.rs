// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Implement write-a-command, read-the-answer control files.
// Author: Lukas Bower

//! Command files.
//!
//! A command file turns one write into a command for a handler and serves the
//! resulting answer to readers. The answer is streamed as text followed by a
//! single NUL byte, so a reader that wants the exact C-string sees where it
//! ends. Sessions are not seekable.
//!
//! The binding context `B` is the durable state a command operates on. It is
//! fixed when the file is created and handed to every session opened on that
//! file, so two files bound to different contexts never see each other's
//! state.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use log::{debug, error};
use synthfs::{Exposure, FileOps, FsError, Mode, NodeId, OpenFile, OpenFlags, Signal, UserBuffer, UserData};

/// Longest command accepted by default, in bytes.
pub const DEFAULT_MAX_COMMAND_LEN: usize = 4096;

/// Durable answer text shared between a binding and its readers.
#[derive(Debug, Default)]
pub struct AnswerSlot {
    text: RwLock<String>,
}

impl AnswerSlot {
    /// Create a slot holding `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(text.into()),
        }
    }

    /// Replace the answer.
    pub fn set(&self, text: impl Into<String>) {
        *self.text.write().unwrap_or_else(PoisonError::into_inner) = text.into();
    }

    /// Copy of the answer.
    #[must_use]
    pub fn get(&self) -> String {
        self.text
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Answer bound to a command file session.
#[derive(Debug, Clone)]
pub enum AnswerHandle {
    /// Text owned by the session and dropped at release.
    Owned(String),
    /// Reference to a slot owned by the binding context.
    Shared(Weak<AnswerSlot>),
}

impl AnswerHandle {
    /// Session-owned answer.
    #[must_use]
    pub fn owned(text: impl Into<String>) -> Self {
        Self::Owned(text.into())
    }

    /// Answer read live from `slot`.
    #[must_use]
    pub fn shared(slot: &Arc<AnswerSlot>) -> Self {
        Self::Shared(Arc::downgrade(slot))
    }

    /// Whether the session owns the text.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    fn resolve(&self) -> Result<String, FsError> {
        match self {
            Self::Owned(text) => Ok(text.clone()),
            Self::Shared(slot) => slot.upgrade().map(|slot| slot.get()).ok_or(FsError::NotFound),
        }
    }
}

/// Executes the command written to a command file.
pub trait CommandHandler<B>: Send + Sync {
    /// Run `command` against `binding`. Blocking waits give up with
    /// [`FsError::Interrupted`] once the writer's `signal` is pending.
    fn handle_command(&self, command: &str, binding: &B, signal: &Signal) -> Result<(), FsError>;
}

impl<B, F> CommandHandler<B> for F
where
    F: Fn(&str, &B, &Signal) -> Result<(), FsError> + Send + Sync,
{
    fn handle_command(&self, command: &str, binding: &B, signal: &Signal) -> Result<(), FsError> {
        self(command, binding, signal)
    }
}

/// Produces the answer a reading session starts from.
pub trait StateProvider<B>: Send + Sync {
    /// Answer for `binding`, or `None` when there is nothing to read.
    fn acquire(&self, binding: &B) -> Option<AnswerHandle>;
}

impl<B, F> StateProvider<B> for F
where
    F: Fn(&B) -> Option<AnswerHandle> + Send + Sync,
{
    fn acquire(&self, binding: &B) -> Option<AnswerHandle> {
        self(binding)
    }
}

/// Command file definition: a binding plus optional handler and provider.
pub struct CommandFile<B> {
    binding: Arc<B>,
    handler: Option<Arc<dyn CommandHandler<B>>>,
    provider: Option<Arc<dyn StateProvider<B>>>,
    max_command_len: usize,
}

impl<B> fmt::Debug for CommandFile<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFile")
            .field("handler", &self.handler.is_some())
            .field("provider", &self.provider.is_some())
            .field("max_command_len", &self.max_command_len)
            .finish_non_exhaustive()
    }
}

impl<B: Send + Sync + 'static> CommandFile<B> {
    /// Command file bound to `binding` with neither handler nor provider.
    #[must_use]
    pub fn new(binding: Arc<B>) -> Self {
        Self {
            binding,
            handler: None,
            provider: None,
            max_command_len: DEFAULT_MAX_COMMAND_LEN,
        }
    }

    /// Accept writes, running them through `handler`.
    #[must_use]
    pub fn with_handler(mut self, handler: impl CommandHandler<B> + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Serve reads, starting each session from `provider`.
    #[must_use]
    pub fn with_provider(mut self, provider: impl StateProvider<B> + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Override the longest accepted command.
    #[must_use]
    pub fn with_max_command_len(mut self, max: usize) -> Self {
        self.max_command_len = max;
        self
    }

    /// Binding context shared by every session.
    #[must_use]
    pub fn binding(&self) -> &Arc<B> {
        &self.binding
    }

    /// Register the file as `name` under `parent`.
    pub fn create(
        self,
        exposure: &dyn Exposure,
        name: &str,
        mode: Mode,
        parent: Option<NodeId>,
    ) -> Result<NodeId, FsError> {
        exposure.create_file(name, mode, parent, Arc::new(self))
    }

    fn acquire(&self) -> Option<AnswerHandle> {
        self.provider
            .as_ref()
            .and_then(|provider| provider.acquire(&self.binding))
    }
}

impl<B: Send + Sync + 'static> FileOps for CommandFile<B> {
    fn open(&self, node: NodeId, flags: OpenFlags) -> Result<Box<dyn OpenFile>, FsError> {
        let readable = flags.contains(OpenFlags::READ);
        let answer = if readable && self.provider.is_some() {
            match self.acquire() {
                Some(answer) => Some(answer),
                None => {
                    error!("command file {}: no state to read", node);
                    return Err(FsError::InvalidState);
                }
            }
        } else {
            None
        };
        Ok(Box::new(CommandSession {
            node,
            binding: Arc::clone(&self.binding),
            handler: self.handler.clone(),
            provider: self.provider.clone(),
            max_command_len: self.max_command_len,
            readable,
            answer,
        }))
    }
}

struct CommandSession<B> {
    node: NodeId,
    binding: Arc<B>,
    handler: Option<Arc<dyn CommandHandler<B>>>,
    provider: Option<Arc<dyn StateProvider<B>>>,
    max_command_len: usize,
    readable: bool,
    answer: Option<AnswerHandle>,
}

impl<B> CommandSession<B> {
    /// Copy the caller's bytes into scratch and turn them into a command.
    fn take_command(&self, data: &dyn UserData) -> Result<String, FsError> {
        let count = data.len();
        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(count + 1)
            .map_err(|_| FsError::OutOfMemory)?;
        scratch.resize(count, 0);
        data.copy_from_user(&mut scratch).map_err(|fault| {
            error!("command file {}: {}", self.node, fault);
            FsError::Io
        })?;
        if let Some(nul) = scratch.iter().position(|&b| b == 0) {
            scratch.truncate(nul);
        }
        if scratch.last() == Some(&b'\n') {
            scratch.pop();
        }
        String::from_utf8(scratch).map_err(|_| {
            error!("command file {}: command is not valid UTF-8", self.node);
            FsError::InvalidArgument
        })
    }
}

impl<B: Send + Sync> OpenFile for CommandSession<B> {
    fn write(
        &mut self,
        signal: &Signal,
        data: &dyn UserData,
        pos: &mut i64,
    ) -> Result<usize, FsError> {
        let Some(handler) = self.handler.clone() else {
            return Err(FsError::Unsupported);
        };
        let count = data.len();
        if count == 0 {
            error!("command file {}: empty command", self.node);
            return Err(FsError::InvalidArgument);
        }
        if *pos != 0 {
            error!(
                "command file {}: command written at offset {}",
                self.node, *pos
            );
            return Err(FsError::InvalidArgument);
        }
        if count > self.max_command_len {
            error!(
                "command file {}: command of {} bytes exceeds {}",
                self.node, count, self.max_command_len
            );
            return Err(FsError::InvalidArgument);
        }
        let command = self.take_command(data)?;
        debug!("command file {}: '{}'", self.node, command);
        handler.handle_command(&command, &self.binding, signal)?;
        if self.readable {
            if let Some(provider) = &self.provider {
                self.answer = provider.acquire(&self.binding);
            }
        }
        Ok(count)
    }

    fn read(
        &mut self,
        _signal: &Signal,
        buf: &mut dyn UserBuffer,
        count: usize,
        pos: &mut i64,
    ) -> Result<usize, FsError> {
        let answer = self.answer.as_ref().ok_or(FsError::InvalidArgument)?;
        let mut text = answer.resolve()?.into_bytes();
        text.push(0);
        let size = text.len();
        let offset = usize::try_from(*pos).map_err(|_| FsError::InvalidArgument)?;
        if offset > size {
            return Err(FsError::InvalidArgument);
        }
        if offset == size || count == 0 {
            return Ok(0);
        }
        let n = count.min(size - offset);
        buf.copy_to_user(0, &text[offset..offset + n])
            .map_err(|_| FsError::Io)?;
        *pos += n as i64;
        Ok(n)
    }

    fn release(&mut self) {
        // Owned text goes with the session; a shared slot stays with its binding.
        self.answer = None;
    }
}
