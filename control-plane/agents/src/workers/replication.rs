//! Replication Subsystem (§4.5): a coordinator per exported, replicated
//! volume that keeps one worker alive per configured target, workers that
//! push simulated replication samples to peer instances over HTTP, and the
//! receive-/stop-side handlers those peers expose.

use crate::registry::{Registry, Role};
use crate::specs::mirror_volume_name;
use rand::Rng;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::time::Duration;
use stor_port::error::TargetCapacityExceededSnafu;
use stor_port::{ReplicationMetricRecord, ReplicationTarget, ReplicationType, SvcError, SystemId, Volume, VolumeId};

const COORDINATOR_INTERVAL: Duration = Duration::from_secs(5);
const SYNC_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);
const SYNC_LOG_INTERVAL: Duration = Duration::from_secs(200);
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Maintains exactly one worker per `(volume, target)` currently configured,
/// reconciling every 5s the way `§4.5`'s coordinator does.
pub fn spawn_coordinator(registry: Registry, volume_id: VolumeId) {
    let shutdown = registry.spawn_task(volume_id.as_str(), Role::ReplicationCoordinator);
    tokio::spawn(async move {
        loop {
            let volume = match registry.get_volume(&volume_id) {
                Ok(v) if v.is_exported && !v.replication_settings.is_empty() => v,
                _ => {
                    for role in registry.active_roles_for(volume_id.as_str()) {
                        if let Role::Replication(target) = role {
                            registry.cancel_task(volume_id.as_str(), &Role::Replication(target));
                        }
                    }
                    tracing::debug!(volume_id = %volume_id, "replication coordinator exiting");
                    return;
                }
            };

            let desired: Vec<SystemId> = volume
                .replication_settings
                .iter()
                .map(|r| r.replication_target.id.clone())
                .collect();
            let active: Vec<SystemId> = registry
                .active_roles_for(volume_id.as_str())
                .into_iter()
                .filter_map(|r| match r {
                    Role::Replication(target) => Some(target),
                    _ => None,
                })
                .collect();

            for target_id in &active {
                if !desired.contains(target_id) {
                    registry.cancel_task(volume_id.as_str(), &Role::Replication(target_id.clone()));
                }
            }
            for setting in &volume.replication_settings {
                if !active.contains(&setting.replication_target.id) {
                    spawn_worker(
                        registry.clone(),
                        volume.clone(),
                        setting.replication_target.clone(),
                        setting.replication_type,
                        setting.delay_sec,
                    );
                }
            }

            if shutdown.race(tokio::time::sleep(COORDINATOR_INTERVAL)).await.is_none() {
                for target_id in active {
                    registry.cancel_task(volume_id.as_str(), &Role::Replication(target_id));
                }
                return;
            }
        }
    });
}

/// One `(volume, target)` worker: samples, records locally, ships to the
/// peer, then sleeps per the replication type's cadence.
pub fn spawn_worker(
    registry: Registry,
    volume: Volume,
    target: ReplicationTarget,
    replication_type: ReplicationType,
    delay_sec: u64,
) {
    let shutdown = registry.spawn_task(volume.id.as_str(), Role::Replication(target.id.clone()));
    tokio::spawn(async move {
        let mut first_sample = true;
        let mut since_last_log = SYNC_LOG_INTERVAL;
        loop {
            let current = match registry.get_volume(&volume.id) {
                Ok(v) if v.is_exported => v,
                _ => return,
            };

            let (iops, latency) = {
                let mut rng = rand::thread_rng();
                (rng.gen_range(50..=500u32), rng.gen_range(1.0..=5.0f64))
            };
            let throughput = iops as f64 / latency;

            upsert_replication_metric(
                &registry,
                ReplicationMetricRecord {
                    volume_id: current.id.clone(),
                    target_key: target.id.to_string(),
                    throughput,
                    latency,
                    iops: Some(iops),
                    replication_type: Some(replication_type),
                    timestamp: chrono::Utc::now(),
                    last_updated: chrono::Utc::now(),
                },
            );

            let should_log = match replication_type {
                ReplicationType::Asynchronous => true,
                ReplicationType::Synchronous => {
                    if first_sample || since_last_log >= SYNC_LOG_INTERVAL {
                        since_last_log = Duration::ZERO;
                        true
                    } else {
                        false
                    }
                }
            };
            first_sample = false;

            if let Some(entry) = registry.global_registry().lookup(target.id.as_str()) {
                if let Ok(system) = registry.get_system() {
                    let payload = ReplicationReceivePayload {
                        volume_id: current.id.clone(),
                        replication_throughput: throughput,
                        sender: system.id.clone(),
                        timestamp: chrono::Utc::now(),
                        replication_type,
                        should_log,
                        latency,
                        source_volume: SourceVolume {
                            id: current.id.clone(),
                            name: current.name.clone(),
                            size: current.size,
                            system_name: system.name.clone(),
                        },
                    };
                    let url = format!("http://127.0.0.1:{}/replication-receive", entry.port);
                    match registry.http().post(&url).timeout(HTTP_TIMEOUT).json(&payload).send().await {
                        Ok(resp) if !resp.status().is_success() => {
                            registry.logger().warn(
                                format!("replication-receive to {} returned {}", entry.port, resp.status()),
                                false,
                            );
                        }
                        Err(err) => {
                            registry
                                .logger()
                                .warn(format!("replication-receive to {} failed: {err}", entry.port), false);
                        }
                        Ok(_) => {}
                    }
                }
            }

            let sleep_for = match replication_type {
                ReplicationType::Asynchronous => Duration::from_secs(delay_sec.max(1)),
                ReplicationType::Synchronous => SYNC_SAMPLE_INTERVAL,
            };
            since_last_log += sleep_for;
            if shutdown.race(tokio::time::sleep(sleep_for)).await.is_none() {
                return;
            }
        }
    });
}

fn upsert_replication_metric(registry: &Registry, record: ReplicationMetricRecord) {
    let mut records: Vec<ReplicationMetricRecord> = registry.facade().load("replication_metrics");
    if let Some(slot) = records
        .iter_mut()
        .find(|r| r.volume_id == record.volume_id && r.target_key == record.target_key)
    {
        *slot = record;
    } else {
        records.push(record);
    }
    if let Err(err) = registry.facade().overwrite("replication_metrics", &records) {
        registry.logger().warn(format!("failed to persist replication metrics: {err}"), false);
    }
}

/// Best-effort notification sent when a replicated volume is unexported.
pub async fn notify_stop(registry: &Registry, target: &ReplicationTarget, volume_id: &VolumeId, reason: &str) {
    let Some(entry) = registry.global_registry().lookup(target.id.as_str()) else {
        return;
    };
    let Ok(system) = registry.get_system() else {
        return;
    };
    let payload = ReplicationStopPayload {
        volume_id: volume_id.clone(),
        reason: reason.to_string(),
        sender: system.id,
    };
    let url = format!("http://127.0.0.1:{}/replication-stop", entry.port);
    if let Err(err) = registry
        .http()
        .post(&url)
        .timeout(HTTP_TIMEOUT)
        .json(&payload)
        .send()
        .await
    {
        registry
            .logger()
            .warn(format!("replication-stop to {} failed: {err}", entry.port), false);
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceVolume {
    pub id: VolumeId,
    pub name: String,
    pub size: u64,
    pub system_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicationReceivePayload {
    pub volume_id: VolumeId,
    pub replication_throughput: f64,
    pub sender: SystemId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub replication_type: ReplicationType,
    pub should_log: bool,
    pub latency: f64,
    pub source_volume: SourceVolume,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicationStopPayload {
    pub volume_id: VolumeId,
    pub reason: String,
    pub sender: SystemId,
}

/// Target-side `/replication-receive` handler (§4.5).
#[tracing::instrument(level = "info", skip(registry, payload), err)]
pub fn handle_receive(registry: &Registry, payload: ReplicationReceivePayload) -> Result<(), SvcError> {
    let _guard = registry.lock_specs();
    let system = registry.get_system()?;
    let mirror_name = mirror_volume_name(
        &payload.source_volume.name,
        payload.replication_type,
        &payload.source_volume.system_name,
    );

    let volumes = registry.list_volumes();
    let exists = volumes.iter().any(|v| v.name == mirror_name);
    if !exists {
        let volumes_capacity: u64 = volumes.iter().map(|v| v.size).sum();
        ensure!(
            volumes_capacity + payload.source_volume.size <= system.max_capacity,
            TargetCapacityExceededSnafu
        );
        let mirror = Volume::new(
            stor_port::VolumeId::new(),
            system.id.clone(),
            mirror_name,
            payload.source_volume.size,
        );
        registry
            .facade()
            .append("volume", &mirror.id.to_string(), mirror)?;
        crate::housekeeper::recompute_metrics(registry)?;
    }

    if payload.should_log {
        if matches!(payload.replication_type, ReplicationType::Synchronous) {
            registry.logger().info(
                format!(
                    "received {} replication for volume {} from {} (latency {:.2}ms)",
                    payload.replication_type.as_ref(),
                    payload.source_volume.id,
                    payload.sender,
                    payload.latency
                ),
                false,
            );
        } else {
            registry.logger().info(
                format!(
                    "received {} replication for volume {} from {}",
                    payload.replication_type.as_ref(),
                    payload.source_volume.id,
                    payload.sender
                ),
                false,
            );
        }
    }

    upsert_replication_metric(
        registry,
        ReplicationMetricRecord {
            volume_id: payload.source_volume.id,
            target_key: format!("received_from_{}", payload.sender),
            throughput: payload.replication_throughput,
            latency: payload.latency,
            iops: None,
            replication_type: Some(payload.replication_type),
            timestamp: payload.timestamp,
            last_updated: chrono::Utc::now(),
        },
    );
    Ok(())
}

/// Target-side `/replication-stop` handler: logs only, removes no state
/// (§4.5 "No target state is removed by stop").
pub fn handle_stop(registry: &Registry, payload: ReplicationStopPayload) {
    registry.logger().info(
        format!(
            "replication stopped for volume {} from {}: {}",
            payload.volume_id, payload.sender, payload.reason
        ),
        false,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::specs::CreateSystemOpts;

    fn new_registry() -> Registry {
        let data_dir = tempfile::tempdir().unwrap();
        let registry_file = tempfile::NamedTempFile::new().unwrap();
        Registry::new(data_dir.path(), registry_file.path(), 5001).unwrap()
    }

    fn payload(source_name: &str, source_size: u64, sender_name: &str) -> ReplicationReceivePayload {
        ReplicationReceivePayload {
            volume_id: VolumeId::new(),
            replication_throughput: 12.5,
            sender: SystemId::new(),
            timestamp: chrono::Utc::now(),
            replication_type: ReplicationType::Asynchronous,
            should_log: true,
            latency: 2.0,
            source_volume: SourceVolume {
                id: VolumeId::new(),
                name: source_name.to_string(),
                size: source_size,
                system_name: sender_name.to_string(),
            },
        }
    }

    #[test]
    fn handle_receive_creates_mirror_volume_with_derived_name() {
        let registry = new_registry();
        registry
            .create_system(CreateSystemOpts {
                max_throughput: None,
                max_capacity: Some(1000),
            })
            .unwrap();
        let p = payload("source-vol", 50, "array-a");
        handle_receive(&registry, p).unwrap();

        let volumes = registry.list_volumes();
        assert_eq!(volumes.len(), 1);
        assert_eq!(
            volumes[0].name,
            mirror_volume_name("source-vol", ReplicationType::Asynchronous, "array-a")
        );
        assert_eq!(volumes[0].size, 50);
    }

    #[test]
    fn handle_receive_is_idempotent_for_an_existing_mirror() {
        let registry = new_registry();
        registry
            .create_system(CreateSystemOpts {
                max_throughput: None,
                max_capacity: Some(1000),
            })
            .unwrap();
        let p = payload("source-vol", 50, "array-a");
        handle_receive(&registry, p).unwrap();
        let p2 = payload("source-vol", 50, "array-a");
        handle_receive(&registry, p2).unwrap();

        assert_eq!(registry.list_volumes().len(), 1);
    }

    #[test]
    fn handle_receive_rejects_when_target_capacity_would_be_exceeded() {
        let registry = new_registry();
        registry
            .create_system(CreateSystemOpts {
                max_throughput: None,
                max_capacity: Some(10),
            })
            .unwrap();
        let p = payload("source-vol", 50, "array-a");
        let err = handle_receive(&registry, p).unwrap_err();
        assert!(matches!(err, SvcError::TargetCapacityExceeded));
        assert!(registry.list_volumes().is_empty());
    }
}
