// SPDX-License-Identifier: GPL-3.0-only

//! Declared and observed partition models
//!
//! `DeclaredPartition` is one entry of the desired partition table as produced
//! by the configuration layer. `ObservedPartition` is one entry of the live
//! table as reported by the state prober. The engine compares the two and
//! never mutates a prober snapshot in place; the planner keeps its own working
//! copy.

use serde::{Deserialize, Serialize};

/// One entry in the desired partition table.
///
/// Fields that distinguish "not set" from "set to zero" use `Option`; the
/// configuration edge maps legacy sentinel zeros (and empty strings) to `None`
/// via [`DeclaredPartition::normalized`] so a genuinely-zero value can never
/// be misread as "auto" further down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclaredPartition {
    /// Partition number. 0 means auto-assign the lowest unused number.
    pub number: u32,

    /// GPT partition label. `None` is a wildcard when matching.
    pub label: Option<String>,

    /// Partition type GUID. `None` is a wildcard when matching.
    pub type_guid: Option<String>,

    /// Unique partition GUID. `None` is a wildcard when matching.
    pub guid: Option<String>,

    /// Start offset in sectors. `None` means place automatically.
    pub start_sectors: Option<u64>,

    /// Size in sectors. `None` means fill the chosen free extent.
    pub size_sectors: Option<u64>,

    /// Whether the partition should exist at all. Defaults to true.
    pub should_exist: bool,

    /// Explicit consent to destroy and recreate (or delete) the partition
    /// entry when it does not match the declaration.
    pub wipe_partition_entry: bool,

    /// Explicit consent to grow or shrink the partition in place when
    /// everything but the size matches.
    pub resize: bool,
}

// Derived `Default` would make `should_exist` false, turning every plainly
// declared partition into a deletion request. Both Rust construction and
// serde's missing-field fallback go through this impl.
impl Default for DeclaredPartition {
    fn default() -> Self {
        Self {
            number: 0,
            label: None,
            type_guid: None,
            guid: None,
            start_sectors: None,
            size_sectors: None,
            should_exist: true,
            wipe_partition_entry: false,
            resize: false,
        }
    }
}

impl DeclaredPartition {
    /// Map sentinel values coming from the configuration edge to `None`:
    /// a start or size of 0 means "auto", an empty string means "don't care".
    pub fn normalized(mut self) -> Self {
        if self.start_sectors == Some(0) {
            self.start_sectors = None;
        }
        if self.size_sectors == Some(0) {
            self.size_sectors = None;
        }
        for field in [&mut self.label, &mut self.type_guid, &mut self.guid] {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }
        self
    }

    /// Whether the partition number is auto-assigned.
    pub fn auto_number(&self) -> bool {
        self.number == 0
    }
}

/// One entry of a live partition table, as reported by the state prober.
///
/// Snapshots are immutable per planning run; the planner clones them into a
/// working copy that it mutates as decisions commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedPartition {
    /// Partition number (1-based).
    pub number: u32,

    /// Start offset in sectors.
    pub start_sectors: u64,

    /// Size in sectors.
    pub size_sectors: u64,

    /// Partition type GUID.
    pub type_guid: String,

    /// Unique partition GUID.
    pub guid: String,

    /// GPT partition label (empty if unset).
    pub label: String,
}

impl ObservedPartition {
    /// First sector past the end of the partition.
    pub fn end_sectors(&self) -> u64 {
        self.start_sectors + self.size_sectors
    }
}
