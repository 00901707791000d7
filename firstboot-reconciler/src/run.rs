// SPDX-License-Identifier: GPL-3.0-only

//! Whole-configuration orchestration
//!
//! Plans every declared disk concurrently - each disk owns an independent
//! device, probe snapshot, and working copy, so there is no shared mutable
//! state between the per-disk tasks. Planning within one disk stays strictly
//! sequential. Filesystem decisions run after partitioning, independently per
//! entry.
//!
//! A failed disk or filesystem never aborts its siblings; the report carries
//! one outcome per entry and the caller fails the provisioning stage if any
//! of them failed.

use std::sync::Arc;
use std::time::Duration;

use firstboot_types::{Action, DeclaredFilesystem, Disk, DiskPlan, FilesystemFormat, StorageConfig};

use crate::error::{ReconcileError, Result};
use crate::filesystem::{FsAction, decide_filesystem};
use crate::planner::plan_disk;
use crate::probe::{StateProber, TableSnapshot};

/// Planning result for one declared disk.
#[derive(Debug)]
pub struct DiskOutcome {
    pub device: String,
    pub result: Result<DiskPlan>,
}

/// Decision result for one declared filesystem.
#[derive(Debug)]
pub struct FilesystemOutcome {
    pub device: String,
    pub result: Result<Action>,
}

/// Outcomes for every disk and filesystem in the configuration.
#[derive(Debug, Default)]
pub struct RunReport {
    pub disks: Vec<DiskOutcome>,
    pub filesystems: Vec<FilesystemOutcome>,
}

impl RunReport {
    /// Whether any disk or filesystem failed to plan. The provisioning stage
    /// must halt rather than continue with a partially-provisioned machine.
    pub fn has_failures(&self) -> bool {
        self.disks.iter().any(|outcome| outcome.result.is_err())
            || self
                .filesystems
                .iter()
                .any(|outcome| outcome.result.is_err())
    }
}

/// Plan the whole configuration. Fails outright only on invalid
/// configuration; per-device errors are reported in the `RunReport`.
pub async fn plan_all(
    config: &StorageConfig,
    prober: Arc<dyn StateProber>,
    probe_timeout: Duration,
) -> Result<RunReport> {
    config.validate()?;

    let mut handles = Vec::new();
    for disk in config.disks.clone() {
        let prober = Arc::clone(&prober);
        let device = disk.device.clone();
        let handle = tokio::spawn(async move {
            let result = plan_disk_with_probe(&disk, prober.as_ref(), probe_timeout).await;
            DiskOutcome {
                device: disk.device,
                result,
            }
        });
        handles.push((device, handle));
    }

    let mut report = RunReport::default();
    for (device, handle) in handles {
        match handle.await {
            Ok(outcome) => report.disks.push(outcome),
            Err(err) => report.disks.push(DiskOutcome {
                device: device.clone(),
                result: Err(ReconcileError::Probe {
                    device,
                    reason: format!("planning task failed: {err}"),
                }),
            }),
        }
    }

    let decisions = config
        .filesystems
        .iter()
        .filter(|fs| fs.format != FilesystemFormat::None)
        .map(|fs| decide_with_probe(fs, prober.as_ref(), probe_timeout));
    report.filesystems = futures::future::join_all(decisions).await;

    Ok(report)
}

async fn plan_disk_with_probe(
    disk: &Disk,
    prober: &dyn StateProber,
    probe_timeout: Duration,
) -> Result<DiskPlan> {
    let snapshot = probe_table(prober, &disk.device, probe_timeout).await?;
    plan_disk(disk, &snapshot)
}

async fn probe_table(
    prober: &dyn StateProber,
    device: &str,
    probe_timeout: Duration,
) -> Result<TableSnapshot> {
    match tokio::time::timeout(probe_timeout, prober.probe_partition_table(device)).await {
        Ok(Ok(snapshot)) => Ok(snapshot),
        Ok(Err(err)) => Err(ReconcileError::Probe {
            device: device.to_string(),
            reason: err.to_string(),
        }),
        Err(_) => Err(ReconcileError::Probe {
            device: device.to_string(),
            reason: format!("partition table probe timed out after {probe_timeout:?}"),
        }),
    }
}

async fn decide_with_probe(
    fs: &DeclaredFilesystem,
    prober: &dyn StateProber,
    probe_timeout: Duration,
) -> FilesystemOutcome {
    let observed = match tokio::time::timeout(probe_timeout, prober.probe_filesystem(&fs.device))
        .await
    {
        Ok(Ok(observed)) => observed,
        Ok(Err(err)) => {
            return FilesystemOutcome {
                device: fs.device.clone(),
                result: Err(ReconcileError::Probe {
                    device: fs.device.clone(),
                    reason: err.to_string(),
                }),
            };
        }
        Err(_) => {
            return FilesystemOutcome {
                device: fs.device.clone(),
                result: Err(ReconcileError::Probe {
                    device: fs.device.clone(),
                    reason: format!("filesystem probe timed out after {probe_timeout:?}"),
                }),
            };
        }
    };

    let result = decide_filesystem(fs, &observed).map(|action| match action {
        FsAction::Reuse => Action::ReuseFilesystem {
            device: fs.device.clone(),
        },
        FsAction::Reformat => Action::Reformat {
            device: fs.device.clone(),
            format: fs.format,
            label: fs.label.clone(),
            uuid: fs.uuid.clone(),
            options: fs.mount_options.clone(),
        },
    });

    FilesystemOutcome {
        device: fs.device.clone(),
        result,
    }
}
