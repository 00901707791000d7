// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem provisioner
//!
//! Decides, per declared filesystem, whether the signature(s) observed on the
//! device allow reusing what is there or require a fresh format. Reuse of
//! existing data is the only non-destructive outcome, so the rules err on the
//! side of reformatting when nothing recognizable would be lost and on the
//! side of failing when the operator's intent is ambiguous.
//!
//! No side effects at this layer; `Reformat`/`Reuse` are intents handed to
//! the executor.

use firstboot_types::{DeclaredFilesystem, FilesystemFormat, ObservedFilesystem};

use crate::error::{ReconcileError, Result};

/// Outcome of a filesystem decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAction {
    /// The existing filesystem satisfies the declaration; leave it intact.
    Reuse,

    /// Wipe signatures and create the declared filesystem.
    Reformat,
}

/// Decide what to do with the filesystem on `declared.device`.
///
/// - `wipeFilesystem` always reformats, regardless of observed state.
/// - No detected signature, or a different format, reformats: there is
///   nothing recognizable to lose, or the format itself did not match.
/// - A matching format with a conflicting specified label or UUID is an
///   error: the intent (reuse or reformat?) cannot be guessed.
/// - Ambivalent signatures reuse when a specified label or UUID pins one
///   interpretation, reformat when nothing is specified, and error when a
///   specified field conflicts with every reading.
pub fn decide_filesystem(
    declared: &DeclaredFilesystem,
    observed: &ObservedFilesystem,
) -> Result<FsAction> {
    if declared.format == FilesystemFormat::None {
        return Ok(FsAction::Reuse);
    }

    if declared.wipe_filesystem {
        tracing::info!(device = %declared.device, "filesystem wipe requested");
        return Ok(FsAction::Reformat);
    }

    let Some(fs_type) = observed.fs_type.as_deref() else {
        tracing::info!(device = %declared.device, "no filesystem signature found, formatting");
        return Ok(FsAction::Reformat);
    };
    if fs_type != declared.format.as_str() {
        tracing::info!(
            device = %declared.device,
            found = fs_type, requested = declared.format.as_str(),
            "filesystem type does not match, reformatting"
        );
        return Ok(FsAction::Reformat);
    }

    let conflict = first_field_conflict(declared, observed);

    if observed.ambivalent {
        return decide_ambivalent(declared, conflict);
    }

    match conflict {
        None => {
            tracing::info!(
                device = %declared.device,
                "filesystem is already correctly formatted, skipping mkfs"
            );
            Ok(FsAction::Reuse)
        }
        Some((field, expected, observed_value)) => Err(ReconcileError::FilesystemMismatch {
            device: declared.device.clone(),
            field,
            expected,
            observed: observed_value,
        }),
    }
}

/// The device carries more than one signature. Reuse is only safe when a
/// specified field singles out one interpretation; an unpinned reading gets
/// reformatted so `mkfs` clears every stale signature; a specified field
/// that matches none of the readings means the operator's intent cannot be
/// guessed and the decision is an error.
fn decide_ambivalent(
    declared: &DeclaredFilesystem,
    conflict: Option<(&'static str, String, String)>,
) -> Result<FsAction> {
    if let Some((field, expected, observed)) = conflict {
        return Err(ReconcileError::AmbiguousFilesystem {
            device: declared.device.clone(),
            reason: format!("declared {field} {expected:?} matches no detected signature (best reading {observed:?})"),
        });
    }
    if declared.label.is_some() || declared.uuid.is_some() {
        tracing::warn!(
            device = %declared.device,
            "multiple filesystem signatures found, reusing the one matching the declaration"
        );
        Ok(FsAction::Reuse)
    } else {
        tracing::warn!(
            device = %declared.device,
            "multiple filesystem signatures found and declaration does not pin one, reformatting"
        );
        Ok(FsAction::Reformat)
    }
}

fn first_field_conflict(
    declared: &DeclaredFilesystem,
    observed: &ObservedFilesystem,
) -> Option<(&'static str, String, String)> {
    if let Some(label) = &declared.label
        && observed.label.as_deref() != Some(label.as_str())
    {
        return Some((
            "label",
            label.clone(),
            observed.label.clone().unwrap_or_default(),
        ));
    }
    if let Some(uuid) = &declared.uuid {
        let canonical_observed = observed
            .uuid
            .as_deref()
            .map(|value| canonicalize_uuid(declared.format, value));
        if canonical_observed.as_deref() != Some(canonicalize_uuid(declared.format, uuid).as_str())
        {
            return Some((
                "UUID",
                uuid.clone(),
                observed.uuid.clone().unwrap_or_default(),
            ));
        }
    }
    None
}

/// Canonicalize a filesystem UUID for comparison. FAT uses a 32-bit volume
/// ID formatted as A1B2-C3D4 by probing tools, but formatting tools do not
/// permit the dash, so both spellings must compare equal.
fn canonicalize_uuid(format: FilesystemFormat, uuid: &str) -> String {
    let uuid = uuid.to_ascii_lowercase();
    if format == FilesystemFormat::Vfat && uuid.len() >= 5 && uuid.as_bytes()[4] == b'-' {
        format!("{}{}", &uuid[0..4], &uuid[5..])
    } else {
        uuid
    }
}
