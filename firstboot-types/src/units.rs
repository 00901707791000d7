// SPDX-License-Identifier: GPL-3.0-only

//! Unit conversion between human-facing sizes (MiB) and the engine's native
//! unit, 512-byte logical sectors.
//!
//! The configuration layer converts everything to sectors before handing a
//! `StorageConfig` to the engine, so sectors are the only unit that appears
//! in planning decisions.

/// Logical sector size in bytes. All on-disk offsets are multiples of this.
pub const SECTOR_SIZE: u64 = 512;

/// Number of logical sectors in one MiB.
pub const SECTORS_PER_MIB: u64 = (1024 * 1024) / SECTOR_SIZE;

/// Partition alignment granularity (1 MiB), expressed in sectors - standard
/// for modern disks.
pub const ALIGNMENT_SECTORS: u64 = SECTORS_PER_MIB;

/// Convert a size or offset in MiB to logical sectors.
pub const fn mib_to_sectors(mib: u64) -> u64 {
    mib * SECTORS_PER_MIB
}

/// Round `sectors` up to the next multiple of `alignment`.
///
/// An alignment of 0 is treated as no alignment.
pub fn align_up(sectors: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return sectors;
    }
    sectors.div_ceil(alignment) * alignment
}

/// Round `sectors` down to the previous multiple of `alignment`.
pub fn align_down(sectors: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return sectors;
    }
    (sectors / alignment) * alignment
}
