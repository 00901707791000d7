// SPDX-License-Identifier: GPL-3.0-only

//! Storage reconciliation engine for first-boot provisioning
//!
//! Compares a disk's observed partition table and filesystem signatures
//! against a declared specification and computes the minimal, safe set of
//! operations to converge the two. The engine is a library: it produces an
//! ordered [`firstboot_types::DiskPlan`] per disk and filesystem intents per
//! declared filesystem, and never touches a device itself.
//!
//! ## Layers
//!
//! - [`matcher`] - classifies a declared partition against an observed one
//! - [`allocator`] - free-extent computation and "auto" start/size resolution
//! - [`planner`] - per-disk state machine producing the ordered action list
//! - [`filesystem`] - reuse/reformat decisions, including ambivalent
//!   signatures
//! - [`probe`] - the observed-state prober trait implemented by callers
//! - [`run`] - concurrent per-disk orchestration over a whole configuration
//!
//! Safety rules are uniform across layers: destructive operations require
//! explicit consent (`wipePartitionEntry`, `wipeTable`, `wipeFilesystem`),
//! and any unsatisfiable declaration fails the disk's whole plan before a
//! single action is handed to the executor.

pub mod allocator;
pub mod error;
pub mod filesystem;
pub mod matcher;
pub mod planner;
pub mod probe;
pub mod run;

pub use error::{ReconcileError, Result};
pub use filesystem::{FsAction, decide_filesystem};
pub use matcher::{MatchResult, match_partition};
pub use planner::plan_disk;
pub use probe::{StateProber, TableSnapshot};
pub use run::{DiskOutcome, FilesystemOutcome, RunReport, plan_all};
