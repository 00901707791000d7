// SPDX-License-Identifier: GPL-3.0-only

//! Partition matcher
//!
//! Decides whether an observed partition satisfies a declared one. Every
//! *specified* declared field must equal the observed value; unspecified
//! fields (`None`) are wildcards, so operators can pin only the fields they
//! care about (e.g. label + type GUID) and leave geometry to auto-detection.
//!
//! Pure comparison; the planner owns the consequences of each result.

use firstboot_types::{ALIGNMENT_SECTORS, DeclaredPartition, ObservedPartition, align_up};

/// Outcome of matching one declared partition against the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// No observed partition exists at the declared number.
    Absent,

    /// An observed partition exists and every specified field is equal.
    ExactMatch,

    /// An observed partition exists but at least one specified field differs.
    /// Carries the first differing field for diagnostics.
    Mismatch {
        field: &'static str,
        expected: String,
        observed: String,
    },
}

/// Match `declared` against the observed partition at its number, if any.
pub fn match_partition(
    declared: &DeclaredPartition,
    observed: Option<&ObservedPartition>,
) -> MatchResult {
    let Some(observed) = observed else {
        return MatchResult::Absent;
    };
    match first_mismatch(declared, observed, false) {
        None => MatchResult::ExactMatch,
        Some(mismatch) => mismatch,
    }
}

/// Whether `observed` matches `declared` in all specified respects except
/// size. The resize path is taken when this holds, `resize` is set, and the
/// declared size differs.
pub fn matches_except_size(declared: &DeclaredPartition, observed: &ObservedPartition) -> bool {
    first_mismatch(declared, observed, true).is_none()
}

/// GUIDs compare case-insensitively; partitioning tools report them in
/// either case depending on version.
fn guid_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn first_mismatch(
    declared: &DeclaredPartition,
    observed: &ObservedPartition,
    ignore_size: bool,
) -> Option<MatchResult> {
    if let Some(start) = declared.start_sectors
        && start != observed.start_sectors
    {
        return Some(MatchResult::Mismatch {
            field: "starting sector",
            expected: start.to_string(),
            observed: observed.start_sectors.to_string(),
        });
    }
    if let Some(guid) = &declared.guid
        && !guid_eq(guid, &observed.guid)
    {
        return Some(MatchResult::Mismatch {
            field: "GUID",
            expected: guid.clone(),
            observed: observed.guid.clone(),
        });
    }
    if let Some(type_guid) = &declared.type_guid
        && !guid_eq(type_guid, &observed.type_guid)
    {
        return Some(MatchResult::Mismatch {
            field: "type GUID",
            expected: type_guid.clone(),
            observed: observed.type_guid.clone(),
        });
    }
    if let Some(label) = &declared.label
        && label != &observed.label
    {
        return Some(MatchResult::Mismatch {
            field: "label",
            expected: label.clone(),
            observed: observed.label.clone(),
        });
    }
    // Creation rounds a declared size up to alignment before committing it,
    // so re-matching must compare the same resolved value or replans of an
    // unaligned size would never converge.
    if !ignore_size
        && let Some(size) = declared.size_sectors.map(|s| align_up(s, ALIGNMENT_SECTORS))
        && size != observed.size_sectors
    {
        return Some(MatchResult::Mismatch {
            field: "size",
            expected: size.to_string(),
            observed: observed.size_sectors.to_string(),
        });
    }
    None
}
