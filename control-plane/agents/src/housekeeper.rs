//! Periodic reconciliation: snapshot retention plus the single source of
//! truth for derived system metrics (§4.6, §9 "centralize in one
//! `recompute_metrics` routine").
//!
//! No code path outside [`recompute_metrics`] is allowed to write the
//! `system_metrics` singleton — every state-changing operation in
//! `specs.rs` calls back into this module rather than poking at the numbers
//! itself.

use crate::registry::Registry;
use shutdown::Shutdown;
use std::time::Duration;
use stor_port::{Setting, SettingKind, Snapshot, SvcError, System, SystemMetrics, Volume};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const FIXED_IOPS: f64 = 2000.0;

/// `L(p)` from §4.6: a step function from combined saturation/capacity
/// pressure to simulated latency in milliseconds.
pub fn latency_step(p: f64) -> f64 {
    if p <= 70.0 {
        1.0
    } else if p <= 80.0 {
        2.0
    } else if p <= 90.0 {
        3.0
    } else if p <= 100.0 {
        4.0
    } else {
        5.0
    }
}

/// Recomputes `system_metrics` from first principles and persists it. Safe
/// to call with no system present (metrics reset to zero); callers after a
/// state-changing operation and the periodic sweep both funnel through here.
pub fn recompute_metrics(registry: &Registry) -> Result<SystemMetrics, SvcError> {
    let systems: Vec<System> = registry.facade().load("system");
    let Some(system) = systems.into_iter().next() else {
        let metrics = SystemMetrics::default();
        registry.facade().overwrite("system_metrics", &metrics)?;
        return Ok(metrics);
    };

    let volumes: Vec<Volume> = registry.facade().load("volume");
    let snapshots: Vec<Snapshot> = registry.facade().load("snapshots");

    let volume_capacity: u64 = volumes.iter().map(|v| v.size).sum();
    let snapshot_capacity: u64 = snapshots.iter().map(|s| s.size).sum();
    let capacity_used = volume_capacity + snapshot_capacity;

    let total_throughput: f64 = volumes
        .iter()
        .filter(|v| v.is_exported)
        .map(|v| FIXED_IOPS * v.workload_size.unwrap_or(8) as f64 / 1024.0)
        .sum::<f64>()
        .min(system.max_throughput);

    let capacity_percentage = if system.max_capacity == 0 {
        0.0
    } else {
        capacity_used as f64 / system.max_capacity as f64 * 100.0
    };
    let saturation = if system.max_throughput == 0.0 {
        0.0
    } else {
        total_throughput / system.max_throughput * 100.0
    };
    let cpu_usage = saturation.min(100.0);
    let current_latency = latency_step(saturation.max(capacity_percentage));

    let metrics = SystemMetrics {
        throughput_used: total_throughput,
        capacity_used,
        saturation,
        cpu_usage,
        volume_capacity,
        snapshot_capacity,
        capacity_percentage,
        current_latency,
    };
    registry.facade().overwrite("system_metrics", &metrics)?;
    Ok(metrics)
}

struct SweepReport {
    snapshots_trimmed: usize,
    capacity_freed: u64,
}

/// One Housekeeper sweep: trim snapshot retention then recompute metrics.
/// Callable on demand (`POST /cleanup`) as well as from the periodic loop.
pub fn sweep(registry: &Registry) -> Result<SystemMetrics, SvcError> {
    let report = trim_snapshot_retention(registry)?;
    let metrics = recompute_metrics(registry)?;
    registry.logger().cleanup_log(format!(
        "sweep trimmed {} snapshot(s), freed {} GB capacity",
        report.snapshots_trimmed, report.capacity_freed
    ));
    Ok(metrics)
}

fn trim_snapshot_retention(registry: &Registry) -> Result<SweepReport, SvcError> {
    let volumes: Vec<Volume> = registry.facade().load("volume");
    let settings: Vec<Setting> = registry.facade().load("settings");
    let mut snapshots: Vec<Snapshot> = registry.facade().load("snapshots");

    let mut trimmed = 0usize;
    let mut freed = 0u64;

    for volume in &volumes {
        for (setting_id, _frequency) in &volume.snapshot_settings {
            let Some(setting) = settings.iter().find(|s| &s.id == setting_id) else {
                continue;
            };
            let SettingKind::Snapshot { max_snapshots, .. } = &setting.kind else {
                continue;
            };
            let max_snapshots = *max_snapshots as usize;

            let mut matching: Vec<&Snapshot> = snapshots
                .iter()
                .filter(|s| s.volume_id == volume.id && &s.snapshot_setting_id == setting_id)
                .collect();
            if matching.len() <= max_snapshots {
                continue;
            }
            matching.sort_by_key(|s| s.created_at);
            let excess = matching.len() - max_snapshots;
            let doomed: Vec<String> = matching
                .iter()
                .take(excess)
                .map(|s| s.id.to_string())
                .collect();

            snapshots.retain(|s| {
                if doomed.contains(&s.id.to_string()) {
                    trimmed += 1;
                    freed += s.size;
                    false
                } else {
                    true
                }
            });
        }
    }

    // Orphaned snapshots (volume already gone, racing a concurrent delete,
    // §5 "Housekeeper tolerates orphan snapshots") are cascaded away here
    // too rather than left to accumulate.
    let live_volume_ids: std::collections::HashSet<_> = volumes.iter().map(|v| v.id.clone()).collect();
    let before = snapshots.len();
    snapshots.retain(|s| {
        let keep = live_volume_ids.contains(&s.volume_id);
        if !keep {
            freed += s.size;
        }
        keep
    });
    trimmed += before - snapshots.len();

    registry.facade().overwrite("snapshots", &snapshots)?;
    Ok(SweepReport {
        snapshots_trimmed: trimmed,
        capacity_freed: freed,
    })
}

/// The Housekeeper's own long-running loop, cancelled only at process
/// shutdown (§5 "The Housekeeper has its own stop token").
pub async fn run(registry: Registry, shutdown: Shutdown) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("housekeeper stopping");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = sweep(&registry) {
                    registry.logger().error(format!("housekeeper sweep failed: {err}"), true);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_step_bands() {
        assert_eq!(latency_step(0.0), 1.0);
        assert_eq!(latency_step(70.0), 1.0);
        assert_eq!(latency_step(70.1), 2.0);
        assert_eq!(latency_step(80.0), 2.0);
        assert_eq!(latency_step(85.0), 3.0);
        assert_eq!(latency_step(90.0), 3.0);
        assert_eq!(latency_step(95.0), 4.0);
        assert_eq!(latency_step(100.0), 4.0);
        assert_eq!(latency_step(100.1), 5.0);
    }

    #[test]
    fn recompute_metrics_with_no_system_resets_to_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Registry::new(tmp.path(), tmp.path().join("global_systems.json"), 5000).unwrap();
        let metrics = recompute_metrics(&registry).unwrap();
        assert_eq!(metrics, SystemMetrics::default());
    }
}
