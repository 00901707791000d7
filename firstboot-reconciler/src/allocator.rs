// SPDX-License-Identifier: GPL-3.0-only

//! Free-space allocator
//!
//! Computes the free extents of a disk from the set of retained partitions
//! and resolves "auto" start/size requests against them. Allocation is
//! strictly sequential: the planner re-derives extents from its working copy
//! after every committed allocation, so each request sees the effect of the
//! previous ones.
//!
//! Extent ordering is a first-class invariant: largest first, ties broken by
//! earliest start, so "the largest chunk" is unambiguous and planning is
//! reproducible bit-for-bit across hosts.

use firstboot_types::{FreeExtent, ObservedPartition, align_down, align_up};
use thiserror::Error;

/// Why a placement request could not be satisfied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("no free extent large enough for {size} sectors")]
    NoFit { size: u64 },

    #[error("no free space left on the disk")]
    NoSpace,

    #[error("requested start sector {start} overlaps existing data")]
    Overlap { start: u64 },

    #[error("no room for {size} sectors at requested start sector {start}")]
    TooSmallAt { start: u64, size: u64 },
}

/// A fully resolved partition placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub start_sectors: u64,
    pub size_sectors: u64,
}

/// Compute the free extents of a disk with `disk_sectors` usable sectors,
/// given the partitions being retained.
///
/// The first `alignment` sectors are reserved for the partition table and
/// never free. Extents are rounded inward to `alignment` and returned sorted
/// by size descending, then start ascending.
pub fn compute_free_extents(
    retained: &[ObservedPartition],
    disk_sectors: u64,
    alignment: u64,
) -> Vec<FreeExtent> {
    let mut occupied: Vec<(u64, u64)> = retained
        .iter()
        .map(|part| (part.start_sectors, part.end_sectors()))
        .collect();
    occupied.sort_unstable();

    let mut extents = Vec::new();
    let mut cursor = alignment.max(1);
    for (start, end) in occupied {
        if start > cursor {
            push_extent(&mut extents, cursor, start, alignment);
        }
        cursor = cursor.max(end);
    }
    if disk_sectors > cursor {
        push_extent(&mut extents, cursor, disk_sectors, alignment);
    }

    extents.sort_by(|a, b| {
        b.size_sectors
            .cmp(&a.size_sectors)
            .then(a.start_sectors.cmp(&b.start_sectors))
    });
    extents
}

fn push_extent(extents: &mut Vec<FreeExtent>, gap_start: u64, gap_end: u64, alignment: u64) {
    let start = align_up(gap_start, alignment);
    let end = align_down(gap_end, alignment);
    if end > start {
        extents.push(FreeExtent {
            start_sectors: start,
            size_sectors: end - start,
        });
    }
}

/// Resolve a size request against the extent the partition lands in.
///
/// `None` resolves to the sectors available from `start` to the end of the
/// extent: an auto-size partition consumes the whole extent, not merely
/// "some free space". Explicit sizes are rounded up to `alignment`.
pub fn resolve_size(
    request: Option<u64>,
    extent: &FreeExtent,
    start: u64,
    alignment: u64,
) -> u64 {
    match request {
        Some(size) => align_up(size, alignment),
        None => extent.remaining_from(start),
    }
}

/// Resolve a start request against the current free extents.
///
/// An explicit start must lie inside a free extent with room for `size`
/// (rounded up to `alignment`). An auto start selects the largest extent
/// that fits `size`; with `size` also auto, the single largest extent wins
/// outright. `extents` must already be in allocator order.
pub fn resolve_start(
    request: Option<u64>,
    extents: &[FreeExtent],
    size: Option<u64>,
    alignment: u64,
) -> Result<(u64, FreeExtent), PlacementError> {
    match request {
        Some(start) => {
            let extent = extents
                .iter()
                .find(|extent| extent.contains(start))
                .copied()
                .ok_or(PlacementError::Overlap { start })?;
            if let Some(size) = size {
                let size = align_up(size, alignment);
                if extent.remaining_from(start) < size {
                    return Err(PlacementError::TooSmallAt { start, size });
                }
            }
            Ok((start, extent))
        }
        None => {
            if extents.is_empty() {
                return Err(PlacementError::NoSpace);
            }
            match size {
                Some(size) => {
                    let size = align_up(size, alignment);
                    let extent = extents
                        .iter()
                        .find(|extent| extent.size_sectors >= size)
                        .copied()
                        .ok_or(PlacementError::NoFit { size })?;
                    Ok((extent.start_sectors, extent))
                }
                // Largest extent outright; the partition will fill it.
                None => Ok((extents[0].start_sectors, extents[0])),
            }
        }
    }
}

/// Resolve a full placement request in one step.
pub fn resolve_placement(
    start: Option<u64>,
    size: Option<u64>,
    extents: &[FreeExtent],
    alignment: u64,
) -> Result<Placement, PlacementError> {
    let (start_sectors, extent) = resolve_start(start, extents, size, alignment)?;
    let size_sectors = resolve_size(size, &extent, start_sectors, alignment);
    Ok(Placement {
        start_sectors,
        size_sectors,
    })
}
