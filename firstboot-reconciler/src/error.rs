// SPDX-License-Identifier: GPL-3.0-only

//! Error taxonomy for the reconciliation engine
//!
//! Every variant carries enough detail (device, partition number, field,
//! expected/observed values) to diagnose a failed plan without re-running.
//! All of them abort planning for the current disk only; sibling disks keep
//! planning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The device could not be probed. Possibly transient; retrying before
    /// invoking the engine is the caller's responsibility.
    #[error("failed to probe {device}: {reason}")]
    Probe { device: String, reason: String },

    /// A declared partition conflicts with observed state and no destructive
    /// consent was given.
    #[error(
        "{device} partition {number}: {field} did not match (specified {expected}, got {observed}) and wipePartitionEntry is false"
    )]
    Mismatch {
        device: String,
        number: u32,
        field: &'static str,
        expected: String,
        observed: String,
    },

    /// Deletion was requested without `wipePartitionEntry` or a table wipe.
    #[error(
        "{device} partition {number}: exists but is specified as nonexistent and wipePartitionEntry is false"
    )]
    ConsentRequired { device: String, number: u32 },

    /// No free extent of sufficient size, or an explicit start overlaps
    /// existing data.
    #[error("{device} partition {number}: {reason}")]
    Allocation {
        device: String,
        number: u32,
        reason: String,
    },

    /// The device carries multiple filesystem signatures and the declared
    /// fields do not pin one interpretation.
    #[error("{device}: ambivalent filesystem signatures, {reason}")]
    AmbiguousFilesystem { device: String, reason: String },

    /// The existing filesystem conflicts with a specified declared field and
    /// no wipe was requested.
    #[error(
        "{device}: filesystem {field} did not match (specified {expected}, got {observed}) and wipeFilesystem is false"
    )]
    FilesystemMismatch {
        device: String,
        field: &'static str,
        expected: String,
        observed: String,
    },

    /// The configuration failed structural validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] firstboot_types::ConfigError),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
