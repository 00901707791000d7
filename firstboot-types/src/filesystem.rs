// SPDX-License-Identifier: GPL-3.0-only

//! Declared and observed filesystem models

use serde::{Deserialize, Serialize};

/// Filesystem formats the provisioner knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemFormat {
    Ext4,
    Btrfs,
    Xfs,
    Vfat,
    Swap,
    /// No filesystem requested; the entry is skipped entirely.
    None,
}

impl FilesystemFormat {
    /// The type string as reported by signature probing tools.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ext4 => "ext4",
            Self::Btrfs => "btrfs",
            Self::Xfs => "xfs",
            Self::Vfat => "vfat",
            Self::Swap => "swap",
            Self::None => "none",
        }
    }

    /// Parse a probe-reported type string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ext4" => Some(Self::Ext4),
            "btrfs" => Some(Self::Btrfs),
            "xfs" => Some(Self::Xfs),
            "vfat" => Some(Self::Vfat),
            "swap" => Some(Self::Swap),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// One entry of the desired filesystem list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredFilesystem {
    /// Device path the filesystem lives on (e.g. "/dev/disk/by-partlabel/root").
    pub device: String,

    /// Requested format.
    pub format: FilesystemFormat,

    /// Filesystem label. `None` is a wildcard when deciding reuse.
    #[serde(default)]
    pub label: Option<String>,

    /// Filesystem UUID. `None` is a wildcard when deciding reuse.
    #[serde(default)]
    pub uuid: Option<String>,

    /// Explicit consent to destroy whatever is on the device and reformat.
    #[serde(default)]
    pub wipe_filesystem: bool,

    /// Options passed through to the formatting tool on reformat.
    #[serde(default)]
    pub mount_options: Vec<String>,
}

/// Filesystem signature(s) observed on a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedFilesystem {
    /// Detected filesystem type, or `None` if no signature was found.
    pub fs_type: Option<String>,

    /// Detected filesystem UUID.
    pub uuid: Option<String>,

    /// Detected filesystem label.
    pub label: Option<String>,

    /// The prober found more than one candidate signature on the same
    /// region (e.g. stale superblock remnants from a prior filesystem).
    /// `fs_type`/`uuid`/`label` then describe the prober's best reading.
    pub ambivalent: bool,
}

impl ObservedFilesystem {
    /// Whether any recognizable filesystem signature was found.
    pub fn is_detected(&self) -> bool {
        self.fs_type.is_some()
    }
}
