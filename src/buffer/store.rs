// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Hold the growable, zero-filled byte store behind an output buffer.
// Author: Lukas Bower

use log::error;
use synthfs::FsError;

/// Default growth increment of an output buffer, in bytes.
pub const DEFAULT_BASELINE: usize = 1000;

/// Growth policy of a [`BufferStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    /// Initial capacity and growth increment.
    pub baseline: usize,
    /// Largest capacity the store may reach; growth beyond it reports
    /// [`FsError::OutOfMemory`].
    pub max_capacity: Option<usize>,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE,
            max_capacity: None,
        }
    }
}

/// Unsynchronised byte store. [`super::OutputBuffer`] wraps it in a lock.
///
/// `bytes.len()` is the capacity. Everything past `data_len` is zero, so the
/// stored text is always followed by a terminating NUL and
/// `data_len < capacity` holds while the store is live.
#[derive(Debug)]
pub struct BufferStore {
    bytes: Vec<u8>,
    data_len: usize,
    limits: BufferLimits,
    destroyed: bool,
}

impl BufferStore {
    /// Allocate `limits.baseline` zeroed bytes.
    pub fn init(limits: BufferLimits) -> Result<Self, FsError> {
        let limits = BufferLimits {
            baseline: limits.baseline.max(1),
            ..limits
        };
        if limits.max_capacity.is_some_and(|max| max < limits.baseline) {
            error!(
                "cannot allocate output buffer of {} bytes: limit is {:?}",
                limits.baseline, limits.max_capacity
            );
            return Err(FsError::OutOfMemory);
        }
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(limits.baseline).map_err(|_| {
            error!("cannot allocate output buffer of {} bytes", limits.baseline);
            FsError::OutOfMemory
        })?;
        bytes.resize(limits.baseline, 0);
        Ok(Self {
            bytes,
            data_len: 0,
            limits,
            destroyed: false,
        })
    }

    /// Current capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Length of the stored data, excluding the terminator.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_len
    }

    /// Whether no data is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_len == 0
    }

    /// Stored data.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.data_len]
    }

    /// Growth policy in effect.
    #[must_use]
    pub fn limits(&self) -> BufferLimits {
        self.limits
    }

    /// Whether [`BufferStore::destroy`] has released the storage.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Release the storage.
    pub fn destroy(&mut self) {
        self.bytes = Vec::new();
        self.data_len = 0;
        self.destroyed = true;
    }

    /// Grow to at least `target` bytes in multiples of the baseline.
    ///
    /// A store that already covers `target` is left untouched. On failure the
    /// store keeps its previous contents and capacity.
    pub fn resize_to_at_least(&mut self, target: usize) -> Result<(), FsError> {
        if self.bytes.len() >= target {
            return Ok(());
        }
        let baseline = self.limits.baseline;
        let size = (target / baseline)
            .checked_add(1)
            .and_then(|blocks| blocks.checked_mul(baseline))
            .ok_or(FsError::OutOfMemory)?;
        if self.limits.max_capacity.is_some_and(|max| size > max) {
            error!(
                "not enough memory to resize the output buffer to {} bytes",
                size
            );
            return Err(FsError::OutOfMemory);
        }
        self.bytes
            .try_reserve_exact(size - self.bytes.len())
            .map_err(|_| {
                error!(
                    "not enough memory to resize the output buffer to {} bytes",
                    size
                );
                FsError::OutOfMemory
            })?;
        self.bytes.resize(size, 0);
        Ok(())
    }

    /// Append `data`, growing the store when necessary.
    pub fn append_bytes(&mut self, data: &[u8]) -> Result<(), FsError> {
        if data.is_empty() {
            return Ok(());
        }
        // +1 keeps room for the terminator; grown memory is already zero.
        let needed = self
            .data_len
            .checked_add(data.len())
            .and_then(|len| len.checked_add(1))
            .ok_or(FsError::OutOfMemory)?;
        self.resize_to_at_least(needed)?;
        self.bytes[self.data_len..self.data_len + data.len()].copy_from_slice(data);
        self.data_len += data.len();
        Ok(())
    }

    /// Append the bytes of `s`.
    pub fn append_string(&mut self, s: &str) -> Result<(), FsError> {
        self.append_bytes(s.as_bytes())
    }

    /// Append each byte as two uppercase hex digits, separated by one space.
    ///
    /// Capacity for the whole rendering is reserved up front, so the text is
    /// appended entirely or not at all.
    pub fn append_hex_bytes(&mut self, data: &[u8]) -> Result<(), FsError> {
        let Some((first, rest)) = data.split_first() else {
            return Ok(());
        };
        let rendered_len = data.len() * 3 - 1;
        let needed = self
            .data_len
            .checked_add(rendered_len + 1)
            .ok_or(FsError::OutOfMemory)?;
        self.resize_to_at_least(needed)?;
        self.append_bytes(hex::encode_upper([*first]).as_bytes())?;
        for byte in rest {
            self.append_bytes(b" ")?;
            self.append_bytes(hex::encode_upper([*byte]).as_bytes())?;
        }
        Ok(())
    }

    /// Forget the stored data and zero the storage, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
        self.data_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(baseline: usize) -> BufferStore {
        BufferStore::init(BufferLimits {
            baseline,
            max_capacity: None,
        })
        .expect("init")
    }

    #[test]
    fn init_allocates_zeroed_baseline() {
        let store = store(16);
        assert_eq!(store.capacity(), 16);
        assert!(store.is_empty());
    }

    #[test]
    fn growth_rounds_up_to_baseline_multiples() {
        let mut store = store(10);
        store.resize_to_at_least(10).expect("covered");
        assert_eq!(store.capacity(), 10);
        store.resize_to_at_least(11).expect("grow");
        assert_eq!(store.capacity(), 20);
        store.resize_to_at_least(20).expect("covered");
        assert_eq!(store.capacity(), 20);
        store.resize_to_at_least(35).expect("grow");
        assert_eq!(store.capacity(), 40);
    }

    #[test]
    fn append_keeps_terminator_room() {
        let mut store = store(4);
        store.append_string("abcd").expect("append");
        assert_eq!(store.as_bytes(), b"abcd");
        assert!(store.len() < store.capacity());
        assert_eq!(store.capacity(), 8);
    }

    #[test]
    fn failed_growth_leaves_store_intact() {
        let mut store = BufferStore::init(BufferLimits {
            baseline: 8,
            max_capacity: Some(8),
        })
        .expect("init");
        store.append_string("abc").expect("fits");
        assert_eq!(
            store.append_string("defghijk"),
            Err(FsError::OutOfMemory)
        );
        assert_eq!(store.as_bytes(), b"abc");
        assert_eq!(store.capacity(), 8);
    }

    #[test]
    fn hex_rendering_is_all_or_nothing() {
        let mut store = BufferStore::init(BufferLimits {
            baseline: 8,
            max_capacity: Some(8),
        })
        .expect("init");
        store.append_hex_bytes(&[0x0d, 0xfa]).expect("fits");
        assert_eq!(store.as_bytes(), b"0D FA");
        assert!(store.append_hex_bytes(&[0x01, 0x02]).is_err());
        assert_eq!(store.as_bytes(), b"0D FA");
    }

    #[test]
    fn clear_zeroes_without_shrinking() {
        let mut store = store(4);
        store.append_string("hello world").expect("append");
        let capacity = store.capacity();
        store.clear();
        assert_eq!(store.capacity(), capacity);
        assert!(store.is_empty());
        store.append_string("x").expect("append");
        assert_eq!(store.as_bytes(), b"x");
    }

    #[test]
    fn init_over_limit_reports_out_of_memory() {
        let result = BufferStore::init(BufferLimits {
            baseline: 100,
            max_capacity: Some(10),
        });
        assert_eq!(result.map(|_| ()), Err(FsError::OutOfMemory));
    }
}
