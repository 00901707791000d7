// SPDX-License-Identifier: GPL-3.0-only

//! Validated storage configuration
//!
//! The multi-version configuration translator (out of scope here) produces a
//! single `StorageConfig`, already normalized to sectors. [`StorageConfig::validate`]
//! performs the structural checks the engine relies on, and
//! [`StorageConfig::normalized`] maps legacy sentinel values to explicit
//! `Option`s before planning.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::filesystem::DeclaredFilesystem;
use crate::partition::DeclaredPartition;

/// Structural configuration errors caught before planning starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("disk entry {index} has an empty device path")]
    EmptyDiskDevice { index: usize },

    #[error("disk {device}: partition number {number} declared more than once")]
    DuplicatePartitionNumber { device: String, number: u32 },

    #[error("disk {device}: a partition with auto-assigned number cannot set shouldExist=false")]
    AutoNumberNonexistent { device: String },

    #[error("disk {device}, partition {number}: invalid {field} {value:?}")]
    InvalidGuid {
        device: String,
        number: u32,
        field: &'static str,
        value: String,
    },

    #[error("filesystem entry {index} has an empty device path")]
    EmptyFilesystemDevice { index: usize },
}

/// The desired state of one disk's partition table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Disk {
    /// Device path of the disk (e.g. "/dev/vda").
    pub device: String,

    /// Discard the entire observed partition table up front. Implies consent
    /// to delete every observed partition.
    pub wipe_table: bool,

    /// Desired partition entries, in declaration order.
    pub partitions: Vec<DeclaredPartition>,
}

/// The validated configuration consumed by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub disks: Vec<Disk>,
    pub filesystems: Vec<DeclaredFilesystem>,
}

impl StorageConfig {
    /// Map sentinel zeros and empty strings in every declared partition to
    /// explicit `None`s. Idempotent.
    pub fn normalized(mut self) -> Self {
        for disk in &mut self.disks {
            disk.partitions = disk
                .partitions
                .drain(..)
                .map(DeclaredPartition::normalized)
                .collect();
        }
        self
    }

    /// Structural validation. Expects a normalized configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, disk) in self.disks.iter().enumerate() {
            if disk.device.is_empty() {
                return Err(ConfigError::EmptyDiskDevice { index });
            }

            let mut seen = Vec::new();
            for part in &disk.partitions {
                if part.auto_number() {
                    if !part.should_exist {
                        return Err(ConfigError::AutoNumberNonexistent {
                            device: disk.device.clone(),
                        });
                    }
                } else {
                    if seen.contains(&part.number) {
                        return Err(ConfigError::DuplicatePartitionNumber {
                            device: disk.device.clone(),
                            number: part.number,
                        });
                    }
                    seen.push(part.number);
                }

                for (field, value) in [("guid", &part.guid), ("typeGuid", &part.type_guid)] {
                    if let Some(value) = value
                        && Uuid::parse_str(value).is_err()
                    {
                        return Err(ConfigError::InvalidGuid {
                            device: disk.device.clone(),
                            number: part.number,
                            field,
                            value: value.clone(),
                        });
                    }
                }
            }
        }

        for (index, fs) in self.filesystems.iter().enumerate() {
            if fs.device.is_empty() {
                return Err(ConfigError::EmptyFilesystemDevice { index });
            }
        }

        Ok(())
    }
}
