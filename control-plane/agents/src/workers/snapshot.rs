//! Snapshot Scheduler (§4.4): one worker per (exported volume, configured
//! snapshot frequency). The Housekeeper, not this worker, enforces
//! retention — this worker only ever appends.

use crate::housekeeper::recompute_metrics;
use crate::registry::{Registry, Role};
use std::time::Duration;
use stor_port::{Snapshot, SnapshotId, Volume};

pub fn spawn(registry: Registry, volume: Volume, frequency_sec: u64, setting_id: stor_port::SettingId) {
    let shutdown = registry.spawn_task(volume.id.as_str(), Role::Snapshot(frequency_sec));
    tokio::spawn(async move {
        loop {
            if shutdown
                .race(tokio::time::sleep(Duration::from_secs(frequency_sec.max(1))))
                .await
                .is_none()
            {
                return;
            }

            let mut current = match registry.get_volume(&volume.id) {
                Ok(v) if v.is_exported => v,
                _ => {
                    tracing::debug!(volume_id = %volume.id, "snapshot worker exiting: volume gone or unexported");
                    return;
                }
            };

            current.snapshot_count += 1;
            if let Err(err) = registry
                .facade()
                .replace("volume", &current.id.to_string(), current.clone())
            {
                registry
                    .logger()
                    .warn(format!("failed to persist snapshot_count for {}: {err}", current.id), false);
                continue;
            }

            match current.snapshot_settings.iter().find(|(id, freq)| **id == setting_id && **freq == frequency_sec) {
                None => {
                    registry.logger().warn(
                        format!(
                            "volume {} no longer has a snapshot setting at frequency {frequency_sec}s, skipping snapshot",
                            current.id
                        ),
                        false,
                    );
                }
                Some(_) => {
                    let snapshot = Snapshot {
                        id: SnapshotId::new(),
                        volume_id: current.id.clone(),
                        snapshot_setting_id: setting_id.clone(),
                        created_at: chrono::Utc::now(),
                        frequency_sec,
                        size: current.size,
                    };
                    if let Err(err) = registry.facade().append("snapshots", &snapshot.id.to_string(), snapshot.clone()) {
                        registry
                            .logger()
                            .warn(format!("failed to persist snapshot for {}: {err}", current.id), false);
                    } else {
                        registry.logger().snapshot_event(format!(
                            "snapshot {} created for volume {} (setting {setting_id}, size {} GB)",
                            snapshot.id, current.id, snapshot.size
                        ));
                    }
                }
            }

            if let Err(err) = recompute_metrics(&registry) {
                registry.logger().warn(format!("failed to recompute metrics: {err}"), false);
            }
        }
    });
}
