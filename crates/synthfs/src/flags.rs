// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Describe open flags and permission bits for synthetic files.
// Author: Lukas Bower

use bitflags::bitflags;

bitflags! {
    /// Direction requested when opening a file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open for reading.
        const READ = 0b01;
        /// Open for writing.
        const WRITE = 0b10;
        /// Open for both directions.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

bitflags! {
    /// Unix-style permission bits attached to a file node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mode: u32 {
        /// Owner may read.
        const OWNER_READ = 0o400;
        /// Owner may write.
        const OWNER_WRITE = 0o200;
        /// Group may read.
        const GROUP_READ = 0o040;
        /// Group may write.
        const GROUP_WRITE = 0o020;
        /// Others may read.
        const OTHER_READ = 0o004;
        /// Others may write.
        const OTHER_WRITE = 0o002;
        /// Readable by everyone (`S_IRUGO`).
        const READ_ALL = Self::OWNER_READ.bits() | Self::GROUP_READ.bits() | Self::OTHER_READ.bits();
        /// Readable by everyone, writable by the owner.
        const CONTROL = Self::READ_ALL.bits() | Self::OWNER_WRITE.bits();
    }
}

impl Mode {
    /// Whether any read bit is set.
    #[must_use]
    pub fn readable(self) -> bool {
        self.intersects(Mode::READ_ALL)
    }

    /// Whether any write bit is set.
    #[must_use]
    pub fn writable(self) -> bool {
        self.intersects(Mode::OWNER_WRITE | Mode::GROUP_WRITE | Mode::OTHER_WRITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_all_is_octal_444() {
        assert_eq!(Mode::READ_ALL.bits(), 0o444);
        assert!(Mode::READ_ALL.readable());
        assert!(!Mode::READ_ALL.writable());
        assert!(Mode::CONTROL.writable());
    }
}
