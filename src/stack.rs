// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Capture trimmed call stacks for diagnostic output.
// Author: Lukas Bower

//! Stack trace capture.
//!
//! The raw unwinder reports every frame, including the frames of the
//! diagnostic machinery itself. [`StackTrace::capture_above`] drops the
//! frames below a caller supplied entry so the trace starts at the frame the
//! caller cares about.

/// Most frames a trimmed trace holds.
pub const MAX_FRAMES: usize = 16;

/// Frames the raw trace may hold below the interesting ones.
pub const LOWER_FRAMES: usize = 6;

/// Slots requested from the raw unwinder, rounded up to a multiple of 16.
pub const NUM_FRAMES_INTERNAL: usize = (MAX_FRAMES + LOWER_FRAMES + 15) & !15;

/// Raw stack unwinder.
pub trait StackSource {
    /// Fill `entries` with return addresses, innermost first, and return how
    /// many were stored.
    fn save(&self, entries: &mut [u64]) -> usize;
}

impl<F> StackSource for F
where
    F: Fn(&mut [u64]) -> usize,
{
    fn save(&self, entries: &mut [u64]) -> usize {
        self(entries)
    }
}

/// Captured return addresses, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTrace {
    entries: Vec<u64>,
}

impl StackTrace {
    /// Capture up to `max_entries` frames starting at `first_entry`.
    ///
    /// The trace starts with `first_entry` and continues with the frames the
    /// unwinder reported after it. When `first_entry` is not in the raw
    /// trace the result holds `first_entry` alone.
    #[must_use]
    pub fn capture_above(source: &dyn StackSource, first_entry: u64, max_entries: usize) -> Self {
        let max_entries = max_entries.min(MAX_FRAMES);
        if max_entries == 0 {
            return Self::default();
        }
        let mut raw = [0u64; NUM_FRAMES_INTERNAL];
        let saved = source.save(&mut raw).min(NUM_FRAMES_INTERNAL);
        let raw = &raw[..saved];

        let mut entries = Vec::with_capacity(max_entries);
        entries.push(first_entry);
        if let Some(found) = raw.iter().position(|&entry| entry == first_entry) {
            entries.extend(raw[found + 1..].iter().copied().take(max_entries - 1));
        }
        Self { entries }
    }

    /// Wrap addresses captured elsewhere.
    #[must_use]
    pub fn from_entries(entries: &[u64]) -> Self {
        Self {
            entries: entries.to_vec(),
        }
    }

    /// Captured addresses.
    #[must_use]
    pub fn entries(&self) -> &[u64] {
        &self.entries
    }

    /// Number of captured frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no frame was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
