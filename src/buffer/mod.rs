// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide the lock-guarded, growable output buffer producers print into.
// Author: Lukas Bower

//! Growable diagnostic output buffer.
//!
//! [`OutputBuffer`] is a cheap-to-clone handle over a [`BufferStore`] guarded
//! by a [`KillableMutex`]. Producers append through it from any thread;
//! readers observe the contents through a file bound with
//! [`OutputBuffer::bind_to_readonly_file`].
//!
//! Append failures never reach the producer. They are logged and the append
//! is dropped, leaving the buffer as it was.

mod format;
mod store;

use std::sync::Arc;

use log::{error, warn};
use synthfs::{Exposure, FsError, Mode, NodeId, Signal};

use crate::readonly::BufferFile;
use crate::stack::StackTrace;
use crate::sync::{Interrupted, KillableGuard, KillableMutex};

pub use format::{FormatError, U64Format};
pub use store::{BufferLimits, BufferStore, DEFAULT_BASELINE};

/// Capacity and fill level of an [`OutputBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Allocated bytes.
    pub capacity: usize,
    /// Bytes holding data.
    pub used: usize,
}

/// Shared handle to a growable output buffer.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    inner: Arc<KillableMutex<BufferStore>>,
}

impl OutputBuffer {
    /// Allocate a buffer with the default baseline of [`DEFAULT_BASELINE`] bytes.
    pub fn new() -> Result<Self, FsError> {
        Self::with_limits(BufferLimits::default())
    }

    /// Allocate a buffer with an explicit growth policy.
    pub fn with_limits(limits: BufferLimits) -> Result<Self, FsError> {
        let store = BufferStore::init(limits)?;
        Ok(Self {
            inner: Arc::new(KillableMutex::new(store)),
        })
    }

    /// Producer API bound to `signal`; waits for the buffer lock give up once
    /// the signal is pending.
    #[must_use]
    pub fn printer<'a>(&'a self, signal: &'a Signal) -> Printer<'a> {
        Printer {
            buffer: self,
            signal,
        }
    }

    /// Append raw bytes.
    pub fn append_bytes(&self, data: &[u8]) {
        self.printer(&Signal::none()).print_raw_bytes(data);
    }

    /// Append the bytes of `s`.
    pub fn append_string(&self, s: &str) {
        self.printer(&Signal::none()).print_string(s);
    }

    /// Append `value` rendered through a printf-style `spec` such as `"%llu"`.
    pub fn append_u64(&self, value: u64, spec: &str) {
        self.printer(&Signal::none()).print_u64(value, spec);
    }

    /// Append `data` as space separated uppercase hex pairs.
    pub fn append_hex_bytes(&self, data: &[u8]) {
        self.printer(&Signal::none()).print_hex_bytes(data);
    }

    /// Append a captured stack trace.
    pub fn print_stack(&self, trace: &StackTrace) {
        self.printer(&Signal::none()).print_stack(trace);
    }

    /// Grow the buffer so it holds at least `target` bytes.
    pub fn resize_to_at_least(&self, target: usize) -> Result<(), FsError> {
        let mut store = self.inner.lock();
        if store.is_destroyed() {
            return Err(FsError::InvalidState);
        }
        store.resize_to_at_least(target)
    }

    /// Forget the stored data, keeping the allocation.
    ///
    /// Callers guarantee that no producer or reader is active, so the lock is
    /// only ever taken uncontended here.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Forget the stored data while producers and readers may be active.
    pub fn reset(&self, signal: &Signal) -> Result<(), Interrupted> {
        self.inner.lock_killable(signal)?.clear();
        Ok(())
    }

    /// Release the storage. Later appends are dropped and reads see an empty
    /// buffer. Destroying twice is harmless.
    pub fn destroy(&self) {
        let mut store = self.inner.lock();
        if !store.is_destroyed() {
            store.destroy();
        }
    }

    /// Whether [`OutputBuffer::destroy`] has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().is_destroyed()
    }

    /// Copy of the stored data.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().as_bytes().to_vec()
    }

    /// Length of the stored data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether no data is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Capacity and fill level, read under one lock hold.
    #[must_use]
    pub fn stats(&self) -> BufferStats {
        let store = self.inner.lock();
        BufferStats {
            capacity: store.capacity(),
            used: store.len(),
        }
    }

    /// Expose the contents as a read-only file `name` under `parent`.
    pub fn bind_to_readonly_file(
        &self,
        exposure: &dyn Exposure,
        name: &str,
        parent: Option<NodeId>,
    ) -> Result<NodeId, FsError> {
        exposure.create_file(
            name,
            Mode::READ_ALL,
            parent,
            Arc::new(BufferFile::new(self.clone())),
        )
    }

    pub(crate) fn lock_killable(
        &self,
        signal: &Signal,
    ) -> Result<KillableGuard<'_, BufferStore>, Interrupted> {
        self.inner.lock_killable(signal)
    }
}

/// Producer view of an [`OutputBuffer`] whose lock waits observe a signal.
#[derive(Debug, Clone, Copy)]
pub struct Printer<'a> {
    buffer: &'a OutputBuffer,
    signal: &'a Signal,
}

impl Printer<'_> {
    fn with_store(&self, what: &str, op: impl FnOnce(&mut BufferStore) -> Result<(), FsError>) {
        let mut store = match self.buffer.lock_killable(self.signal) {
            Ok(store) => store,
            Err(Interrupted) => {
                warn!("{} dropped: interrupted while waiting for the buffer", what);
                return;
            }
        };
        if store.is_destroyed() {
            warn!("{} dropped: output buffer is destroyed", what);
            return;
        }
        if let Err(err) = op(&mut *store) {
            error!("{} dropped: {}", what, err);
        }
    }

    /// Append raw bytes.
    pub fn print_raw_bytes(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.with_store("append", |store| store.append_bytes(data));
    }

    /// Append the bytes of `s`.
    pub fn print_string(&self, s: &str) {
        self.print_raw_bytes(s.as_bytes());
    }

    /// Append `value` rendered through a printf-style `spec`.
    pub fn print_u64(&self, value: u64, spec: &str) {
        let format = match U64Format::parse(spec) {
            Ok(format) => format,
            Err(err) => {
                error!("cannot print {}: {}", value, err);
                return;
            }
        };
        let rendered = match format.render(value) {
            Ok(rendered) => rendered,
            Err(err) => {
                error!("cannot render {} with '{}': {}", value, spec, err);
                return;
            }
        };
        self.print_string(&rendered);
    }

    /// Append `data` as space separated uppercase hex pairs.
    pub fn print_hex_bytes(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.with_store("hex append", |store| store.append_hex_bytes(data));
    }

    /// Append a stack trace under one lock hold so frames from concurrent
    /// producers never interleave.
    pub fn print_stack(&self, trace: &StackTrace) {
        let mut lines = format!("stack entries: {}\n", trace.len());
        for (index, entry) in trace.entries().iter().enumerate() {
            lines.push_str(&format!("stack entry #{}: [<{:#018x}>]\n", index, entry));
        }
        self.with_store("stack trace", |store| store.append_string(&lines));
    }
}
