// SPDX-License-Identifier: GPL-3.0-only

//! Partition planner
//!
//! Orchestrates the matcher and the allocator across all declared partitions
//! of one disk, producing the ordered action list an executor applies.
//!
//! Processing order is deterministic and required for reproducibility:
//! explicit-numbered declarations first in ascending number order, then
//! auto-numbered (number 0) declarations in declaration order, each adopting
//! an existing matching partition or receiving the lowest unused number.
//! Auto-numbered entries always go last so explicit numbering is never
//! perturbed by auto-assignment.
//!
//! The planner owns a working copy of the observed table and mutates it as
//! each decision commits, so later allocations see the effect of earlier
//! ones. Any consent, mismatch, or allocation failure aborts the whole
//! disk's plan: there is no partial application.

use firstboot_types::{
    ALIGNMENT_SECTORS, Action, DeclaredPartition, Disk, DiskPlan, ObservedPartition, align_up,
};

use crate::allocator::{compute_free_extents, resolve_placement};
use crate::error::{ReconcileError, Result};
use crate::matcher::{MatchResult, match_partition, matches_except_size};
use crate::probe::TableSnapshot;

/// Plan one disk: compare the declared partitions against the observed
/// snapshot and emit the ordered action list plus the final table.
pub fn plan_disk(disk: &Disk, snapshot: &TableSnapshot) -> Result<DiskPlan> {
    let mut working = snapshot.partitions.clone();
    let mut actions = Vec::new();

    if disk.wipe_table {
        tracing::info!(device = %disk.device, "wiping partition table requested");
        working.sort_by_key(|part| part.number);
        for part in working.drain(..) {
            actions.push(Action::DeletePartition {
                device: disk.device.clone(),
                number: part.number,
            });
        }
    }

    let mut explicit: Vec<&DeclaredPartition> = disk
        .partitions
        .iter()
        .filter(|part| !part.auto_number())
        .collect();
    explicit.sort_by_key(|part| part.number);

    // Numbers owned by a declaration this run; an auto-numbered entry may
    // only adopt a partition nothing else has claimed.
    let mut claimed: Vec<u32> = Vec::new();

    for declared in explicit {
        claimed.push(declared.number);
        plan_partition(
            disk,
            declared,
            declared.number,
            snapshot.disk_sectors,
            &mut working,
            &mut actions,
        )?;
    }

    for declared in disk.partitions.iter().filter(|part| part.auto_number()) {
        // Re-runs must converge to all-noop: before assigning a fresh
        // number, adopt an unclaimed partition that already satisfies the
        // declaration (lowest number wins for determinism).
        if let Some(number) = working
            .iter()
            .filter(|part| !claimed.contains(&part.number))
            .filter(|part| match_partition(declared, Some(part)) == MatchResult::ExactMatch)
            .map(|part| part.number)
            .min()
        {
            tracing::info!(device = %disk.device, number, "auto-numbered partition already satisfied");
            claimed.push(number);
            actions.push(Action::PartitionUnchanged {
                device: disk.device.clone(),
                number,
            });
            continue;
        }

        let number = lowest_unused_number(&working);
        tracing::debug!(device = %disk.device, number, "auto-assigned partition number");
        claimed.push(number);
        plan_partition(
            disk,
            declared,
            number,
            snapshot.disk_sectors,
            &mut working,
            &mut actions,
        )?;
    }

    working.sort_by_key(|part| part.number);
    Ok(DiskPlan {
        device: disk.device.clone(),
        actions,
        final_table: working,
    })
}

/// Decision matrix for a single declared partition against the working copy.
fn plan_partition(
    disk: &Disk,
    declared: &DeclaredPartition,
    number: u32,
    disk_sectors: u64,
    working: &mut Vec<ObservedPartition>,
    actions: &mut Vec<Action>,
) -> Result<()> {
    let device = &disk.device;
    let observed = working.iter().find(|part| part.number == number).cloned();
    let result = match_partition(declared, observed.as_ref());
    let wipe_entry = declared.wipe_partition_entry;

    match (observed, declared.should_exist) {
        (None, false) => {
            tracing::info!(device = %device, number, "partition specified as nonexistent and none found");
            actions.push(Action::PartitionUnchanged {
                device: device.clone(),
                number,
            });
            Ok(())
        }
        (None, true) => create_partition(device, declared, number, disk_sectors, working, actions),
        (Some(_), false) => {
            if !wipe_entry {
                return Err(ReconcileError::ConsentRequired {
                    device: device.clone(),
                    number,
                });
            }
            tracing::info!(device = %device, number, "deleting partition");
            delete_partition(device, number, working, actions);
            Ok(())
        }
        (Some(existing), true) => match result {
            MatchResult::ExactMatch => {
                tracing::info!(device = %device, number, "partition found with correct specifications");
                actions.push(Action::PartitionUnchanged {
                    device: device.clone(),
                    number,
                });
                Ok(())
            }
            MatchResult::Mismatch {
                field,
                expected,
                observed: observed_value,
            } => {
                // A size-only difference becomes an in-place resize when
                // destruction was consented to, either via `resize` (grow or
                // shrink without recreating) or via `wipePartitionEntry`
                // (recreating with identical fields at the same start is a
                // resize). Any other difference needs a full wipe.
                if (declared.resize || wipe_entry) && matches_except_size(declared, &existing) {
                    return resize_partition(
                        device,
                        declared,
                        &existing,
                        number,
                        disk_sectors,
                        working,
                        actions,
                    );
                }
                if wipe_entry {
                    tracing::info!(
                        device = %device, number,
                        "partition did not meet specifications, wiping entry and recreating"
                    );
                    delete_partition(device, number, working, actions);
                    return create_partition(
                        device,
                        declared,
                        number,
                        disk_sectors,
                        working,
                        actions,
                    );
                }
                Err(ReconcileError::Mismatch {
                    device: device.clone(),
                    number,
                    field,
                    expected,
                    observed: observed_value,
                })
            }
            // `observed` is Some, so the matcher cannot report Absent.
            MatchResult::Absent => unreachable!("matcher reported absent for an observed partition"),
        },
    }
}

/// Grow or shrink `existing` in place. The matcher guarantees the declared
/// size is specified and differs while everything else matched.
#[allow(clippy::too_many_arguments)]
fn resize_partition(
    device: &str,
    declared: &DeclaredPartition,
    existing: &ObservedPartition,
    number: u32,
    disk_sectors: u64,
    working: &mut [ObservedPartition],
    actions: &mut Vec<Action>,
) -> Result<()> {
    let size_sectors = align_up(declared.size_sectors.unwrap_or(0), ALIGNMENT_SECTORS);

    // An in-place grow is bounded by the next partition (or the end of the
    // disk); the start never moves.
    let limit = working
        .iter()
        .filter(|part| part.start_sectors > existing.start_sectors)
        .map(|part| part.start_sectors)
        .min()
        .unwrap_or(disk_sectors);
    let available = limit.saturating_sub(existing.start_sectors);
    if size_sectors > available {
        return Err(ReconcileError::Allocation {
            device: device.to_string(),
            number,
            reason: format!(
                "no room to resize to {size_sectors} sectors in place ({available} available)"
            ),
        });
    }

    tracing::info!(
        device = %device, number,
        from = existing.size_sectors, to = size_sectors,
        "resizing partition in place"
    );
    if let Some(entry) = working.iter_mut().find(|part| part.number == number) {
        entry.size_sectors = size_sectors;
    }
    actions.push(Action::ResizePartition {
        device: device.to_string(),
        number,
        size_sectors,
    });
    Ok(())
}

fn delete_partition(
    device: &str,
    number: u32,
    working: &mut Vec<ObservedPartition>,
    actions: &mut Vec<Action>,
) {
    working.retain(|part| part.number != number);
    actions.push(Action::DeletePartition {
        device: device.to_string(),
        number,
    });
}

fn create_partition(
    device: &str,
    declared: &DeclaredPartition,
    number: u32,
    disk_sectors: u64,
    working: &mut Vec<ObservedPartition>,
    actions: &mut Vec<Action>,
) -> Result<()> {
    let extents = compute_free_extents(working, disk_sectors, ALIGNMENT_SECTORS);
    let placement = resolve_placement(
        declared.start_sectors,
        declared.size_sectors,
        &extents,
        ALIGNMENT_SECTORS,
    )
    .map_err(|err| ReconcileError::Allocation {
        device: device.to_string(),
        number,
        reason: err.to_string(),
    })?;

    tracing::info!(
        device = %device, number,
        start = placement.start_sectors, size = placement.size_sectors,
        "creating partition"
    );

    // Commit to the working copy immediately so subsequent allocations see
    // these sectors as occupied.
    working.push(ObservedPartition {
        number,
        start_sectors: placement.start_sectors,
        size_sectors: placement.size_sectors,
        type_guid: declared.type_guid.clone().unwrap_or_default(),
        guid: declared.guid.clone().unwrap_or_default(),
        label: declared.label.clone().unwrap_or_default(),
    });
    actions.push(Action::CreatePartition {
        device: device.to_string(),
        number,
        start_sectors: placement.start_sectors,
        size_sectors: placement.size_sectors,
        label: declared.label.clone(),
        type_guid: declared.type_guid.clone(),
        guid: declared.guid.clone(),
    });
    Ok(())
}

fn lowest_unused_number(working: &[ObservedPartition]) -> u32 {
    let mut number = 1;
    while working.iter().any(|part| part.number == number) {
        number += 1;
    }
    number
}

#[cfg(test)]
mod tests {
    use super::*;
    use firstboot_types::mib_to_sectors;

    const DISK_SECTORS: u64 = mib_to_sectors(10240);

    fn snapshot(partitions: Vec<ObservedPartition>) -> TableSnapshot {
        TableSnapshot {
            partitions,
            disk_sectors: DISK_SECTORS,
        }
    }

    fn disk(wipe_table: bool, partitions: Vec<DeclaredPartition>) -> Disk {
        Disk {
            device: "/dev/vda".to_string(),
            wipe_table,
            partitions,
        }
    }

    fn observed(number: u32, start: u64, size: u64, label: &str) -> ObservedPartition {
        ObservedPartition {
            number,
            start_sectors: start,
            size_sectors: size,
            type_guid: "0FC63DAF-8483-4772-8E79-3D69D8477DE4".to_string(),
            guid: String::new(),
            label: label.to_string(),
        }
    }

    #[test]
    fn empty_declaration_on_empty_disk_is_noop() {
        let plan = plan_disk(&disk(false, vec![]), &snapshot(vec![])).unwrap();
        assert!(plan.actions.is_empty());
        assert!(plan.final_table.is_empty());
    }

    #[test]
    fn wipe_table_deletes_every_observed_partition() {
        let snap = snapshot(vec![
            observed(2, 4096, 2048, "b"),
            observed(1, 2048, 2048, "a"),
        ]);
        let plan = plan_disk(&disk(true, vec![]), &snap).unwrap();
        assert_eq!(
            plan.actions,
            vec![
                Action::DeletePartition {
                    device: "/dev/vda".to_string(),
                    number: 1,
                },
                Action::DeletePartition {
                    device: "/dev/vda".to_string(),
                    number: 2,
                },
            ]
        );
        assert!(plan.final_table.is_empty());
    }

    #[test]
    fn explicit_partitions_process_in_ascending_number_order() {
        let declared = vec![
            DeclaredPartition {
                number: 3,
                size_sectors: Some(mib_to_sectors(32)),
                ..Default::default()
            },
            DeclaredPartition {
                number: 1,
                size_sectors: Some(mib_to_sectors(32)),
                ..Default::default()
            },
        ];
        let plan = plan_disk(&disk(false, declared), &snapshot(vec![])).unwrap();
        let numbers: Vec<u32> = plan
            .actions
            .iter()
            .map(|action| match action {
                Action::CreatePartition { number, .. } => *number,
                other => panic!("unexpected action {other:?}"),
            })
            .collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn default_built_declaration_creates_on_empty_disk() {
        // A declaration that sets nothing beyond number and size must end up
        // on disk; `should_exist` defaults to true for struct-update
        // construction just as for JSON.
        let declared = vec![DeclaredPartition {
            number: 1,
            size_sectors: Some(3000),
            ..Default::default()
        }];
        let plan = plan_disk(&disk(false, declared), &snapshot(vec![])).unwrap();
        assert!(matches!(
            plan.actions[0],
            Action::CreatePartition { number: 1, .. }
        ));
        assert_eq!(plan.final_table.len(), 1);
    }

    #[test]
    fn auto_numbers_fill_lowest_gaps_after_explicit() {
        let declared = vec![
            DeclaredPartition {
                label: Some("dos".to_string()),
                size_sectors: Some(mib_to_sectors(32)),
                ..Default::default()
            },
            DeclaredPartition {
                number: 2,
                label: Some("uno".to_string()),
                size_sectors: Some(mib_to_sectors(32)),
                ..Default::default()
            },
        ];
        let plan = plan_disk(&disk(false, declared), &snapshot(vec![])).unwrap();
        // Explicit 2 first, then the auto entry takes 1.
        assert!(matches!(
            plan.actions[0],
            Action::CreatePartition { number: 2, .. }
        ));
        assert!(matches!(
            plan.actions[1],
            Action::CreatePartition { number: 1, .. }
        ));
    }

    #[test]
    fn auto_numbered_entry_adopts_an_existing_match() {
        let snap = snapshot(vec![
            observed(1, 2048, mib_to_sectors(32), "boot"),
            observed(2, 2048 + mib_to_sectors(32), mib_to_sectors(64), "data"),
        ]);
        let declared = vec![DeclaredPartition {
            label: Some("data".to_string()),
            ..Default::default()
        }];
        let plan = plan_disk(&disk(false, declared), &snap).unwrap();
        assert_eq!(
            plan.actions,
            vec![Action::PartitionUnchanged {
                device: "/dev/vda".to_string(),
                number: 2,
            }]
        );
    }

    #[test]
    fn auto_numbered_entry_cannot_adopt_a_claimed_partition() {
        // The explicit declaration owns partition 1; the auto entry with the
        // same shape must create a new partition instead of adopting it.
        let snap = snapshot(vec![observed(1, 2048, mib_to_sectors(32), "data")]);
        let declared = vec![
            DeclaredPartition {
                number: 1,
                label: Some("data".to_string()),
                ..Default::default()
            },
            DeclaredPartition {
                label: Some("data".to_string()),
                size_sectors: Some(mib_to_sectors(32)),
                ..Default::default()
            },
        ];
        let plan = plan_disk(&disk(false, declared), &snap).unwrap();
        assert!(matches!(
            plan.actions[1],
            Action::CreatePartition { number: 2, .. }
        ));
    }

    #[test]
    fn matching_partition_is_unchanged() {
        let snap = snapshot(vec![observed(1, 2048, mib_to_sectors(32), "boot")]);
        let declared = vec![DeclaredPartition {
            number: 1,
            label: Some("boot".to_string()),
            ..Default::default()
        }];
        let plan = plan_disk(&disk(false, declared), &snap).unwrap();
        assert!(plan.is_noop());
        assert_eq!(plan.final_table, snap.partitions);
    }

    #[test]
    fn replanning_an_unaligned_size_is_noop() {
        let declared = vec![DeclaredPartition {
            number: 1,
            size_sectors: Some(3000),
            ..Default::default()
        }];
        let first = plan_disk(&disk(false, declared.clone()), &snapshot(vec![])).unwrap();
        assert_eq!(first.final_table[0].size_sectors, 4096);

        let second = plan_disk(&disk(false, declared), &snapshot(first.final_table)).unwrap();
        assert!(second.is_noop(), "second plan was {:?}", second.actions);
    }

    #[test]
    fn mismatch_without_consent_fails_the_disk() {
        let snap = snapshot(vec![observed(9, 2048, mib_to_sectors(128), "ROOT")]);
        let declared = vec![DeclaredPartition {
            number: 9,
            size_sectors: Some(mib_to_sectors(2)),
            ..Default::default()
        }];
        let err = plan_disk(&disk(false, declared), &snap).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Mismatch {
                number: 9,
                field: "size",
                ..
            }
        ));
    }

    #[test]
    fn deletion_without_consent_fails_the_disk() {
        let snap = snapshot(vec![observed(1, 2048, 2048, "stale")]);
        let declared = vec![DeclaredPartition {
            number: 1,
            should_exist: false,
            ..Default::default()
        }];
        let err = plan_disk(&disk(false, declared), &snap).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::ConsentRequired { number: 1, .. }
        ));
    }

    #[test]
    fn deletion_with_consent_removes_the_partition() {
        let snap = snapshot(vec![observed(1, 2048, 2048, "stale")]);
        let declared = vec![DeclaredPartition {
            number: 1,
            should_exist: false,
            wipe_partition_entry: true,
            ..Default::default()
        }];
        let plan = plan_disk(&disk(false, declared), &snap).unwrap();
        assert_eq!(
            plan.actions,
            vec![Action::DeletePartition {
                device: "/dev/vda".to_string(),
                number: 1,
            }]
        );
        assert!(plan.final_table.is_empty());
    }

    #[test]
    fn matching_partition_declared_nonexistent_still_needs_consent() {
        // Even a partition that matches the declared shape may only be
        // deleted with explicit consent.
        let snap = snapshot(vec![observed(1, 2048, 2048, "data")]);
        let declared = vec![DeclaredPartition {
            number: 1,
            label: Some("data".to_string()),
            should_exist: false,
            ..Default::default()
        }];
        let err = plan_disk(&disk(false, declared), &snap).unwrap_err();
        assert!(matches!(err, ReconcileError::ConsentRequired { .. }));
    }

    #[test]
    fn mismatch_with_wipe_entry_recreates() {
        let snap = snapshot(vec![observed(1, 2048, mib_to_sectors(64), "old")]);
        let declared = vec![DeclaredPartition {
            number: 1,
            label: Some("new".to_string()),
            size_sectors: Some(mib_to_sectors(32)),
            wipe_partition_entry: true,
            ..Default::default()
        }];
        let plan = plan_disk(&disk(false, declared), &snap).unwrap();
        assert!(matches!(
            plan.actions[0],
            Action::DeletePartition { number: 1, .. }
        ));
        assert!(matches!(
            plan.actions[1],
            Action::CreatePartition { number: 1, .. }
        ));
        assert_eq!(plan.final_table[0].label, "new");
        assert_eq!(plan.final_table[0].size_sectors, mib_to_sectors(32));
    }

    #[test]
    fn resize_in_place_grows_the_partition() {
        let snap = snapshot(vec![observed(9, 2048, mib_to_sectors(128), "ROOT")]);
        let declared = vec![DeclaredPartition {
            number: 9,
            label: Some("ROOT".to_string()),
            size_sectors: Some(mib_to_sectors(6352)),
            resize: true,
            ..Default::default()
        }];
        let plan = plan_disk(&disk(false, declared), &snap).unwrap();
        assert_eq!(
            plan.actions,
            vec![Action::ResizePartition {
                device: "/dev/vda".to_string(),
                number: 9,
                size_sectors: mib_to_sectors(6352),
            }]
        );
        assert_eq!(plan.final_table[0].size_sectors, mib_to_sectors(6352));
        assert_eq!(plan.final_table[0].start_sectors, 2048);
    }

    #[test]
    fn wipe_entry_with_size_only_difference_resizes_in_place() {
        let snap = snapshot(vec![observed(9, 2048, mib_to_sectors(128), "ROOT")]);
        let declared = vec![DeclaredPartition {
            number: 9,
            label: Some("ROOT".to_string()),
            type_guid: Some("0FC63DAF-8483-4772-8E79-3D69D8477DE4".to_string()),
            size_sectors: Some(mib_to_sectors(6352)),
            wipe_partition_entry: true,
            ..Default::default()
        }];
        let plan = plan_disk(&disk(false, declared), &snap).unwrap();
        assert_eq!(
            plan.actions,
            vec![Action::ResizePartition {
                device: "/dev/vda".to_string(),
                number: 9,
                size_sectors: mib_to_sectors(6352),
            }]
        );
    }

    #[test]
    fn resize_with_no_room_in_place_fails() {
        let snap = snapshot(vec![
            observed(1, 2048, mib_to_sectors(128), "boot"),
            observed(2, 2048 + mib_to_sectors(256), mib_to_sectors(128), "data"),
        ]);
        let declared = vec![DeclaredPartition {
            number: 1,
            label: Some("boot".to_string()),
            size_sectors: Some(mib_to_sectors(512)),
            resize: true,
            ..Default::default()
        }];
        let err = plan_disk(&disk(false, declared), &snap).unwrap_err();
        assert!(matches!(err, ReconcileError::Allocation { number: 1, .. }));
    }

    #[test]
    fn resize_consent_does_not_cover_other_field_changes() {
        let snap = snapshot(vec![observed(9, 2048, mib_to_sectors(128), "ROOT")]);
        let declared = vec![DeclaredPartition {
            number: 9,
            label: Some("var".to_string()),
            size_sectors: Some(mib_to_sectors(256)),
            resize: true,
            ..Default::default()
        }];
        let err = plan_disk(&disk(false, declared), &snap).unwrap_err();
        assert!(matches!(err, ReconcileError::Mismatch { field: "label", .. }));
    }

    #[test]
    fn allocation_failure_aborts_the_whole_disk() {
        // First declaration succeeds, second cannot fit; the error must
        // surface rather than a partial plan.
        let declared = vec![
            DeclaredPartition {
                number: 1,
                size_sectors: Some(mib_to_sectors(10000)),
                ..Default::default()
            },
            DeclaredPartition {
                number: 2,
                size_sectors: Some(mib_to_sectors(1024)),
                ..Default::default()
            },
        ];
        let err = plan_disk(&disk(false, declared), &snapshot(vec![])).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Allocation { number: 2, .. }
        ));
    }

    #[test]
    fn auto_size_partition_fills_its_extent() {
        let declared = vec![DeclaredPartition {
            number: 1,
            label: Some("data".to_string()),
            ..Default::default()
        }];
        let plan = plan_disk(&disk(false, declared), &snapshot(vec![])).unwrap();
        match &plan.actions[0] {
            Action::CreatePartition {
                start_sectors,
                size_sectors,
                ..
            } => {
                assert_eq!(*start_sectors, 2048);
                assert_eq!(*size_sectors, DISK_SECTORS - 2048);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn lowest_unused_number_skips_taken_numbers() {
        let working = vec![
            observed(1, 2048, 2048, ""),
            observed(2, 4096, 2048, ""),
            observed(4, 8192, 2048, ""),
        ];
        assert_eq!(lowest_unused_number(&working), 3);
        assert_eq!(lowest_unused_number(&[]), 1);
    }
}
