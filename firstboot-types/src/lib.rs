// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for the first-boot storage provisioning engine
//!
//! This crate defines the single source of truth for the types shared between
//! the configuration layer, the reconciliation engine, and the executor:
//!
//! - **firstboot-reconciler**: consumes the declared/observed models and emits
//!   `Action` lists
//! - the configuration translator (out of tree): produces a validated
//!   `StorageConfig` in these types, already normalized to sectors
//! - the executor (out of tree): consumes serialized `DiskPlan`/`Action` values
//!   and drives the real partitioning and formatting tools
//!
//! All values are constructed fresh per planning invocation; nothing here
//! persists between runs except on the physical disk itself.

pub mod action;
pub mod config;
pub mod extent;
pub mod filesystem;
pub mod partition;
pub mod units;

pub use action::{Action, DiskPlan};
pub use config::{ConfigError, Disk, StorageConfig};
pub use extent::FreeExtent;
pub use filesystem::{DeclaredFilesystem, FilesystemFormat, ObservedFilesystem};
pub use partition::{DeclaredPartition, ObservedPartition};
pub use units::{
    ALIGNMENT_SECTORS, SECTOR_SIZE, SECTORS_PER_MIB, align_down, align_up, mib_to_sectors,
};
