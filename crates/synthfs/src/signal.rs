// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Model a task's pending-signal state for interruptible waits.
// Author: Lukas Bower

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pending-signal flag carried by a caller into blocking operations.
///
/// Clones share the same flag, so one thread may raise a signal that another
/// thread's wait observes. [`Signal::none`] never fires.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    pending: Option<Arc<AtomicBool>>,
}

impl Signal {
    /// Create a signal that can be raised.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    /// A signal that is never pending.
    #[must_use]
    pub const fn none() -> Self {
        Self { pending: None }
    }

    /// Mark the signal pending.
    pub fn raise(&self) {
        if let Some(flag) = &self.pending {
            flag.store(true, Ordering::SeqCst);
        }
    }

    /// Clear a pending signal.
    pub fn clear(&self) {
        if let Some(flag) = &self.pending {
            flag.store(false, Ordering::SeqCst);
        }
    }

    /// Whether the signal is currently pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}
