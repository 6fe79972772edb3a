// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide an exclusive mutex whose waits can be abandoned on a pending signal.
// Author: Lukas Bower

//! Interruptible ("killable") mutex.
//!
//! Ownership is tracked by a `locked` flag guarded by a std mutex and a
//! condition variable. A waiter sleeps on the condition variable in short
//! slices and re-checks its [`Signal`] between slices, so a raised signal
//! aborts the wait with [`Interrupted`] instead of blocking forever.

use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use synthfs::{FsError, Signal};
use thiserror::Error;

/// Longest a waiter sleeps before re-checking its signal.
const SIGNAL_POLL: Duration = Duration::from_millis(5);

/// A lock wait was abandoned because the caller's signal was pending.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("interrupted while waiting for lock")]
pub struct Interrupted;

impl From<Interrupted> for FsError {
    fn from(_: Interrupted) -> Self {
        FsError::Interrupted
    }
}

/// Exclusive mutex with interruptible acquisition.
#[derive(Debug, Default)]
pub struct KillableMutex<T> {
    locked: Mutex<bool>,
    released: Condvar,
    data: Mutex<T>,
}

impl<T> KillableMutex<T> {
    /// Wrap `value`.
    pub fn new(value: T) -> Self {
        Self {
            locked: Mutex::new(false),
            released: Condvar::new(),
            data: Mutex::new(value),
        }
    }

    /// Acquire the lock, giving up if `signal` becomes pending first.
    pub fn lock_killable(&self, signal: &Signal) -> Result<KillableGuard<'_, T>, Interrupted> {
        let mut locked = self.locked.lock().unwrap_or_else(PoisonError::into_inner);
        while *locked {
            if signal.is_pending() {
                return Err(Interrupted);
            }
            locked = self
                .released
                .wait_timeout(locked, SIGNAL_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        if signal.is_pending() {
            return Err(Interrupted);
        }
        *locked = true;
        drop(locked);
        // Only the owner of the flag touches `data`, so this never contends
        // beyond the previous owner's guard teardown.
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(KillableGuard { owner: self, data })
    }

    /// Acquire the lock without observing any signal.
    pub fn lock(&self) -> KillableGuard<'_, T> {
        match self.lock_killable(&Signal::none()) {
            Ok(guard) => guard,
            Err(Interrupted) => unreachable!("a silent signal never fires"),
        }
    }

    /// Access the value without locking; requires exclusive ownership.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn unlock(&self) {
        let mut locked = self.locked.lock().unwrap_or_else(PoisonError::into_inner);
        *locked = false;
        drop(locked);
        self.released.notify_one();
    }
}

/// Exclusive access to the value of a [`KillableMutex`].
pub struct KillableGuard<'a, T> {
    owner: &'a KillableMutex<T>,
    data: MutexGuard<'a, T>,
}

impl<T> Deref for KillableGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for KillableGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T> Drop for KillableGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn uncontended_lock_is_granted() {
        let mutex = KillableMutex::new(1u32);
        *mutex.lock_killable(&Signal::new()).expect("lock") += 1;
        assert_eq!(*mutex.lock(), 2);
    }

    #[test]
    fn pending_signal_aborts_contended_wait() {
        let mutex = Arc::new(KillableMutex::new(()));
        let held = mutex.lock();
        let signal = Signal::new();
        let waiter = {
            let mutex = Arc::clone(&mutex);
            let signal = signal.clone();
            thread::spawn(move || mutex.lock_killable(&signal).map(|_| ()))
        };
        thread::sleep(Duration::from_millis(20));
        signal.raise();
        assert_eq!(waiter.join().expect("join"), Err(Interrupted));
        drop(held);
        assert!(mutex.lock_killable(&Signal::new()).is_ok());
    }

    #[test]
    fn waiter_acquires_after_release() {
        let mutex = Arc::new(KillableMutex::new(0u64));
        let held = mutex.lock();
        let waiter = {
            let mutex = Arc::clone(&mutex);
            thread::spawn(move || {
                *mutex.lock_killable(&Signal::new()).expect("lock") += 5;
            })
        };
        thread::sleep(Duration::from_millis(10));
        drop(held);
        waiter.join().expect("join");
        assert_eq!(*mutex.lock(), 5);
    }

    #[test]
    fn pending_signal_fails_even_uncontended() {
        let mutex = KillableMutex::new(());
        let signal = Signal::new();
        signal.raise();
        assert!(mutex.lock_killable(&signal).is_err());
    }
}
