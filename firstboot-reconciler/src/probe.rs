// SPDX-License-Identifier: GPL-3.0-only

//! Observed-state prober interface
//!
//! The engine never reads a device itself; callers supply a `StateProber`
//! backed by the real partition/filesystem probing tools (sfdisk dumps,
//! libblkid, udisks - whatever the platform provides). The engine consumes
//! one snapshot per disk per planning run.

use async_trait::async_trait;
use firstboot_types::{ObservedFilesystem, ObservedPartition};

/// A point-in-time snapshot of one disk's partition table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Observed partition entries, in no particular order.
    pub partitions: Vec<ObservedPartition>,

    /// Usable size of the disk in sectors.
    pub disk_sectors: u64,
}

/// Reads the current partition table and filesystem signatures of a device.
///
/// Probing is the only blocking operation in a planning run; the orchestrator
/// wraps every call in a bounded timeout. A probe failure is fatal to that
/// device's plan only, never to the whole run. Retry/backoff for devices that
/// have not appeared yet belongs to the caller, before the engine is invoked.
#[async_trait]
pub trait StateProber: Send + Sync {
    /// Snapshot the partition table of `device`.
    async fn probe_partition_table(&self, device: &str) -> anyhow::Result<TableSnapshot>;

    /// Probe the filesystem signature(s) on `device`.
    async fn probe_filesystem(&self, device: &str) -> anyhow::Result<ObservedFilesystem>;
}
