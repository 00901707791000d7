// SPDX-License-Identifier: GPL-3.0-only

//! Action list emitted by planning
//!
//! Actions are intents only. The executor that shells out to the real
//! partitioning and formatting tools consumes these serialized, reporting a
//! simple pass/fail per action; nothing in the engine touches a device.

use serde::{Deserialize, Serialize};

use crate::filesystem::FilesystemFormat;
use crate::partition::ObservedPartition;

/// A single reconciliation step, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Action {
    /// Remove partition `number` from the table on `device`.
    #[serde(rename_all = "camelCase")]
    DeletePartition { device: String, number: u32 },

    /// Create a partition with fully resolved geometry. `label`, `type_guid`
    /// and `guid` are `None` when the declaration left them to the tool's
    /// defaults.
    #[serde(rename_all = "camelCase")]
    CreatePartition {
        device: String,
        number: u32,
        start_sectors: u64,
        size_sectors: u64,
        label: Option<String>,
        type_guid: Option<String>,
        guid: Option<String>,
    },

    /// Grow or shrink partition `number` in place to `size_sectors`.
    #[serde(rename_all = "camelCase")]
    ResizePartition {
        device: String,
        number: u32,
        size_sectors: u64,
    },

    /// The observed partition already satisfies the declaration.
    #[serde(rename_all = "camelCase")]
    PartitionUnchanged { device: String, number: u32 },

    /// Wipe all signatures on `device` and create a fresh filesystem.
    #[serde(rename_all = "camelCase")]
    Reformat {
        device: String,
        format: FilesystemFormat,
        label: Option<String>,
        uuid: Option<String>,
        options: Vec<String>,
    },

    /// The existing filesystem satisfies the declaration; leave data intact.
    #[serde(rename_all = "camelCase")]
    ReuseFilesystem { device: String },
}

impl Action {
    /// Whether executing this action destroys or rewrites on-disk state.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DeletePartition { .. } | Self::ResizePartition { .. } | Self::Reformat { .. }
        )
    }
}

/// The full ordered plan for one disk, plus the table the disk will have
/// after the executor applies it (for verification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskPlan {
    /// Device path of the disk.
    pub device: String,

    /// Actions in the order the executor must apply them.
    pub actions: Vec<Action>,

    /// The working-copy table after all actions, sorted by partition number.
    pub final_table: Vec<ObservedPartition>,
}

impl DiskPlan {
    /// Whether the plan changes nothing on disk.
    pub fn is_noop(&self) -> bool {
        self.actions
            .iter()
            .all(|action| matches!(action, Action::PartitionUnchanged { .. }))
    }
}
