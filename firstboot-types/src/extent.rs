// SPDX-License-Identifier: GPL-3.0-only

//! Free-extent model used by the allocator

use serde::{Deserialize, Serialize};

/// A maximal, alignment-rounded contiguous run of unallocated sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeExtent {
    /// First sector of the extent (inclusive).
    pub start_sectors: u64,

    /// Length of the extent in sectors.
    pub size_sectors: u64,
}

impl FreeExtent {
    /// First sector past the end of the extent.
    pub fn end_sectors(&self) -> u64 {
        self.start_sectors + self.size_sectors
    }

    /// Whether `sector` falls inside this extent.
    pub fn contains(&self, sector: u64) -> bool {
        sector >= self.start_sectors && sector < self.end_sectors()
    }

    /// Sectors available from `start` (which must lie inside the extent) to
    /// the end of the extent.
    pub fn remaining_from(&self, start: u64) -> u64 {
        self.end_sectors().saturating_sub(start)
    }
}
