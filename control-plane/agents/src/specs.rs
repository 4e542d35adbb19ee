//! Resource Model & Invariant Keeper (§4.2): the only place allowed to
//! mutate `system`/`host`/`volume`/`settings`/`snapshots`, and the only
//! place that spawns or cancels the workers those mutations imply.
//!
//! Every operation here is a `Registry` method: load the current state,
//! check the invariant that applies, persist through the façade, then
//! adjust the worker population and derived metrics to match. The
//! `specs_lock` held across each check-then-write sequence is what keeps
//! two concurrent requests on the same instance from both passing a check
//! before either persists.

use crate::housekeeper::recompute_metrics;
use crate::registry::{Registry, Role};
use crate::workers;
use serde::{Deserialize, Serialize};
use snafu::OptionExt;
use stor_port::error::*;
use stor_port::{
    Host, HostId, ReplicationType, Setting, SettingId, SettingKind, Snapshot, SvcError, System,
    SystemId, SystemMetrics, Volume, VolumeId, VolumeReplicationSetting,
};

#[derive(Debug, Deserialize, Default)]
pub struct CreateSystemOpts {
    pub max_throughput: Option<f64>,
    pub max_capacity: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SystemView {
    pub system_id: SystemId,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVolumeRequest {
    pub setting_ids: Vec<SettingId>,
    pub snapshot_frequencies: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSettingRequest {
    pub name: String,
    #[serde(flatten)]
    pub kind: SettingKind,
}

impl Registry {
    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn create_system(&self, opts: CreateSystemOpts) -> Result<SystemView, SvcError> {
        let _guard = self.lock_specs();
        let systems: Vec<System> = self.facade().load("system");
        if !systems.is_empty() {
            return SystemAlreadyExistsSnafu.fail();
        }
        let system = System {
            id: SystemId::new(),
            name: self.port.to_string(),
            max_throughput: opts.max_throughput.unwrap_or(200.0),
            max_capacity: opts.max_capacity.unwrap_or(1024),
        };
        self.facade()
            .append("system", &system.id.to_string(), system.clone())?;
        self.global_registry().upsert(stor_port::RegistryEntry {
            id: system.id.clone(),
            name: system.name.clone(),
            port: self.port,
        });
        self.facade().overwrite("system_metrics", &SystemMetrics::default())?;
        self.logger()
            .info(format!("system {} created on port {}", system.id, self.port), true);
        Ok(SystemView {
            system_id: system.id,
            port: self.port,
        })
    }

    pub fn get_system(&self) -> Result<System, SvcError> {
        let systems: Vec<System> = self.facade().load("system");
        systems.into_iter().next().context(SystemNotFoundSnafu)
    }

    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn update_system_name(&self, name: String) -> Result<System, SvcError> {
        let _guard = self.lock_specs();
        let mut system = self.get_system()?;
        system.name = name;
        self.facade().replace("system", &system.id.to_string(), system.clone())?;
        Ok(system)
    }

    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn delete_system(&self) -> Result<(), SvcError> {
        let _guard = self.lock_specs();
        let systems: Vec<System> = self.facade().load("system");
        let Some(system) = systems.into_iter().next() else {
            return Ok(());
        };
        let volumes: Vec<Volume> = self.facade().load("volume");
        for volume in &volumes {
            self.cancel_all_for(volume.id.as_str());
        }
        self.facade().delete::<Volume>("volume", None)?;
        self.facade().delete::<Snapshot>("snapshots", None)?;
        self.facade().delete::<Host>("host", None)?;
        self.facade().delete::<Setting>("settings", None)?;
        self.facade().delete::<System>("system", None)?;
        self.global_registry().remove(system.id.as_str());
        recompute_metrics(self)?;
        self.logger().info(format!("system {} deleted", system.id), true);
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn create_host(
        &self,
        name: String,
        application_type: String,
        protocol: String,
    ) -> Result<Host, SvcError> {
        let _guard = self.lock_specs();
        let system = self.get_system()?;
        let hosts: Vec<Host> = self.facade().load("host");
        if hosts.iter().any(|h| h.system_id == system.id && h.name == name) {
            return HostNameConflictSnafu {
                system_id: system.id,
                name,
            }
            .fail();
        }
        let host = Host {
            id: HostId::new(),
            system_id: system.id,
            name,
            application_type,
            protocol,
        };
        self.facade().append("host", &host.id.to_string(), host.clone())?;
        Ok(host)
    }

    pub fn get_host(&self, host_id: &HostId) -> Result<Host, SvcError> {
        let hosts: Vec<Host> = self.facade().load("host");
        hosts
            .into_iter()
            .find(|h| &h.id == host_id)
            .context(HostNotFoundSnafu {
                host_id: host_id.clone(),
            })
    }

    pub fn list_hosts(&self) -> Vec<Host> {
        self.facade().load("host")
    }

    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn update_host(
        &self,
        host_id: &HostId,
        name: String,
        application_type: String,
        protocol: String,
    ) -> Result<Host, SvcError> {
        let _guard = self.lock_specs();
        let mut host = self.get_host(host_id)?;
        let hosts: Vec<Host> = self.facade().load("host");
        if hosts
            .iter()
            .any(|h| h.id != *host_id && h.system_id == host.system_id && h.name == name)
        {
            return HostNameConflictSnafu {
                system_id: host.system_id,
                name,
            }
            .fail();
        }
        host.name = name;
        host.application_type = application_type;
        host.protocol = protocol;
        self.facade().replace("host", &host.id.to_string(), host.clone())?;
        Ok(host)
    }

    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn delete_host(&self, host_id: &HostId) -> Result<(), SvcError> {
        let _guard = self.lock_specs();
        self.get_host(host_id)?;
        let volumes: Vec<Volume> = self.facade().load("volume");
        for volume in volumes
            .iter()
            .filter(|v| v.exported_host_id.as_ref() == Some(host_id))
        {
            let _ = self.unexport_volume_locked(&volume.id, "host deletion");
        }
        self.facade().delete::<Host>("host", Some(host_id.as_str()))?;
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn create_volume(&self, system_id: &SystemId, name: String, size: u64) -> Result<Volume, SvcError> {
        let _guard = self.lock_specs();
        let system = self.get_system()?;
        if &system.id != system_id {
            return SystemNotFoundSnafu.fail();
        }
        if size > system.max_capacity {
            return CapacityExceededSnafu {
                used: 0u64,
                requested: size,
                max: system.max_capacity,
            }
            .fail();
        }
        let capacity_used = self.capacity_used();
        if capacity_used + size > system.max_capacity {
            return CapacityExceededSnafu {
                used: capacity_used,
                requested: size,
                max: system.max_capacity,
            }
            .fail();
        }
        let volume = Volume::new(VolumeId::new(), system.id, name, size);
        self.facade()
            .append("volume", &volume.id.to_string(), volume.clone())?;
        recompute_metrics(self)?;
        Ok(volume)
    }

    fn capacity_used(&self) -> u64 {
        let volumes: Vec<Volume> = self.facade().load("volume");
        let snapshots: Vec<Snapshot> = self.facade().load("snapshots");
        volumes.iter().map(|v| v.size).sum::<u64>() + snapshots.iter().map(|s| s.size).sum::<u64>()
    }

    pub fn get_volume(&self, volume_id: &VolumeId) -> Result<Volume, SvcError> {
        let volumes: Vec<Volume> = self.facade().load("volume");
        volumes
            .into_iter()
            .find(|v| &v.id == volume_id)
            .context(VolumeNotFoundSnafu {
                volume_id: volume_id.clone(),
            })
    }

    pub fn list_volumes(&self) -> Vec<Volume> {
        self.facade().load("volume")
    }

    /// Applies the set difference between a volume's currently-applied
    /// settings and the requested list, unexporting first so workers never
    /// observe a half-updated configuration, then re-exporting with the
    /// same host if the volume was running before the call (§4.2).
    #[tracing::instrument(level = "info", skip(self, request), err)]
    pub fn update_volume(&self, volume_id: &VolumeId, request: UpdateVolumeRequest) -> Result<Volume, SvcError> {
        let _guard = self.lock_specs();
        let mut volume = self.get_volume(volume_id)?;
        let was_exported = volume.is_exported;
        let prior_host = volume.exported_host_id.clone();
        let prior_workload_size = volume.workload_size;

        if was_exported {
            self.unexport_volume_unlocked(&mut volume, "volume update")?;
        }

        let settings: Vec<Setting> = self.facade().load("settings");
        for id in &request.setting_ids {
            if !settings.iter().any(|s| &s.id == id) {
                return InvalidSettingIdsSnafu {
                    ids: vec![id.to_string()],
                }
                .fail();
            }
        }

        let current_ids: Vec<SettingId> = volume
            .snapshot_settings
            .keys()
            .cloned()
            .chain(volume.replication_settings.iter().map(|r| r.setting_id.clone()))
            .collect();
        let (removed, added) = crate::registry::setting_diff(current_ids.iter(), request.setting_ids.iter());

        for id in &removed {
            volume.snapshot_settings.remove(id);
            volume.replication_settings.retain(|r| &r.setting_id != id);
        }
        for id in &added {
            let setting = settings.iter().find(|s| &s.id == id).expect("validated above");
            match &setting.kind {
                SettingKind::Snapshot { value, .. } => {
                    volume.snapshot_settings.insert(id.clone(), *value);
                }
                SettingKind::Replication {
                    replication_type,
                    delay_sec,
                    replication_target,
                } => {
                    if replication_target.id == volume.system_id {
                        return ReplicationTargetIsSelfSnafu.fail();
                    }
                    if volume
                        .replication_settings
                        .iter()
                        .any(|r| r.replication_target.id == replication_target.id)
                    {
                        return DuplicateReplicationTargetSnafu {
                            volume_id: volume.id.clone(),
                            target_id: replication_target.id.clone(),
                        }
                        .fail();
                    }
                    volume.replication_settings.push(VolumeReplicationSetting {
                        setting_id: id.clone(),
                        replication_type: *replication_type,
                        delay_sec: *delay_sec,
                        replication_target: replication_target.clone(),
                    });
                }
            }
        }
        volume.snapshot_frequencies = request.snapshot_frequencies;

        self.facade()
            .replace("volume", &volume.id.to_string(), volume.clone())?;

        if was_exported {
            if let Some(host_id) = prior_host {
                self.export_volume_locked(&mut volume, host_id, prior_workload_size)?;
            }
        }
        recompute_metrics(self)?;
        Ok(volume)
    }

    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), SvcError> {
        let _guard = self.lock_specs();
        self.get_volume(volume_id)?;
        self.cancel_all_for(volume_id.as_str());
        let mut snapshots: Vec<Snapshot> = self.facade().load("snapshots");
        snapshots.retain(|s| &s.volume_id != volume_id);
        self.facade().overwrite("snapshots", &snapshots)?;
        self.facade().delete::<Volume>("volume", Some(volume_id.as_str()))?;
        recompute_metrics(self)?;
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self, request), err)]
    pub fn create_setting(&self, request: CreateSettingRequest) -> Result<Setting, SvcError> {
        let _guard = self.lock_specs();
        let system = self.get_system()?;
        validate_setting_kind(&request.kind, &system.id)?;
        let setting = Setting {
            id: SettingId::new(),
            system_id: system.id,
            name: request.name,
            kind: request.kind,
        };
        self.facade()
            .append("settings", &setting.id.to_string(), setting.clone())?;
        Ok(setting)
    }

    pub fn get_setting(&self, setting_id: &SettingId) -> Result<Setting, SvcError> {
        let settings: Vec<Setting> = self.facade().load("settings");
        settings
            .into_iter()
            .find(|s| &s.id == setting_id)
            .context(SettingNotFoundSnafu {
                setting_id: setting_id.clone(),
            })
    }

    pub fn list_settings(&self) -> Vec<Setting> {
        self.facade().load("settings")
    }

    /// Mutates a setting in place and, for every exported volume that
    /// references it, stops and restarts the worker the setting controls
    /// so the change takes effect without a full unexport.
    #[tracing::instrument(level = "info", skip(self, kind), err)]
    pub fn update_setting(&self, setting_id: &SettingId, kind: SettingKind) -> Result<Setting, SvcError> {
        let _guard = self.lock_specs();
        let mut setting = self.get_setting(setting_id)?;
        validate_setting_kind(&kind, &setting.system_id)?;

        let volumes: Vec<Volume> = self.facade().load("volume");
        if let SettingKind::Replication { replication_target, .. } = &kind {
            for volume in volumes.iter().filter(|v| v.references_setting(setting_id)) {
                if volume
                    .replication_settings
                    .iter()
                    .any(|r| &r.setting_id != setting_id && r.replication_target.id == replication_target.id)
                {
                    return DuplicateReplicationTargetSnafu {
                        volume_id: volume.id.clone(),
                        target_id: replication_target.id.clone(),
                    }
                    .fail();
                }
            }
        }

        for volume in volumes.iter().filter(|v| v.is_exported && v.references_setting(setting_id)) {
            match &kind {
                SettingKind::Snapshot { .. } => {
                    self.cancel_task(volume.id.as_str(), &Role::Snapshot(frequency_for(volume, setting_id)));
                }
                SettingKind::Replication { .. } => {
                    // Cancel the worker for whichever target is *currently* active, not the
                    // newly requested one — they differ when this call is changing targets.
                    for r in volume.replication_settings.iter().filter(|r| &r.setting_id == setting_id) {
                        self.cancel_task(volume.id.as_str(), &Role::Replication(r.replication_target.id.clone()));
                    }
                }
            }
        }

        setting.kind = kind;
        self.facade()
            .replace("settings", &setting.id.to_string(), setting.clone())?;

        for volume in volumes.iter().filter(|v| v.is_exported && v.references_setting(setting_id)) {
            let mut volume = volume.clone();
            if let SettingKind::Snapshot { value, .. } = &setting.kind {
                volume.snapshot_settings.insert(setting_id.clone(), *value);
                self.facade()
                    .replace("volume", &volume.id.to_string(), volume.clone())?;
                workers::snapshot::spawn(self.clone(), volume.clone(), *value, setting_id.clone());
            }
            if let SettingKind::Replication {
                replication_type,
                delay_sec,
                replication_target,
            } = &setting.kind
            {
                for r in volume.replication_settings.iter_mut() {
                    if &r.setting_id == setting_id {
                        r.replication_type = *replication_type;
                        r.delay_sec = *delay_sec;
                        r.replication_target = replication_target.clone();
                    }
                }
                self.facade()
                    .replace("volume", &volume.id.to_string(), volume.clone())?;
                workers::replication::spawn_worker(
                    self.clone(),
                    volume.clone(),
                    replication_target.clone(),
                    *replication_type,
                    *delay_sec,
                );
            }
        }
        Ok(setting)
    }

    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn delete_setting(&self, setting_id: &SettingId) -> Result<(), SvcError> {
        let _guard = self.lock_specs();
        self.get_setting(setting_id)?;
        self.facade()
            .delete::<Setting>("settings", Some(setting_id.as_str()))?;
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self), err)]
    pub fn export_volume(
        &self,
        volume_id: &VolumeId,
        host_id: HostId,
        workload_size_kb: Option<u64>,
    ) -> Result<Volume, SvcError> {
        let _guard = self.lock_specs();
        let mut volume = self.get_volume(volume_id)?;
        if volume.is_exported {
            return VolumeAlreadyExportedSnafu {
                volume_id: volume.id,
            }
            .fail();
        }
        let host = self.get_host(&host_id)?;
        if host.system_id != volume.system_id {
            return HostNotFoundSnafu { host_id }.fail();
        }
        self.export_volume_locked(&mut volume, host_id, workload_size_kb)?;
        recompute_metrics(self)?;
        Ok(volume)
    }

    fn export_volume_locked(
        &self,
        volume: &mut Volume,
        host_id: HostId,
        workload_size_kb: Option<u64>,
    ) -> Result<(), SvcError> {
        volume.is_exported = true;
        volume.exported_host_id = Some(host_id);
        volume.workload_size = workload_size_kb;
        self.facade()
            .replace("volume", &volume.id.to_string(), volume.clone())?;

        workers::workload::spawn(self.clone(), volume.clone());
        for frequency in volume.snapshot_frequencies.clone() {
            let setting_id = volume
                .snapshot_settings
                .iter()
                .find(|(_, v)| **v == frequency)
                .map(|(id, _)| id.clone());
            if let Some(setting_id) = setting_id {
                workers::snapshot::spawn(self.clone(), volume.clone(), frequency, setting_id);
            }
        }
        if !volume.replication_settings.is_empty() {
            workers::replication::spawn_coordinator(self.clone(), volume.id.clone());
        }
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self, reason), err)]
    pub fn unexport_volume(&self, volume_id: &VolumeId, reason: &str) -> Result<Volume, SvcError> {
        let _guard = self.lock_specs();
        self.unexport_volume_locked(volume_id, reason)
    }

    fn unexport_volume_locked(&self, volume_id: &VolumeId, reason: &str) -> Result<Volume, SvcError> {
        let mut volume = self.get_volume(volume_id)?;
        if !volume.is_exported {
            return VolumeNotExportedSnafu {
                volume_id: volume.id,
            }
            .fail();
        }
        self.unexport_volume_unlocked(&mut volume, reason)?;
        recompute_metrics(self)?;
        Ok(volume)
    }

    /// Shared by `unexport_volume` and `update_volume` (which unexports
    /// without re-checking `is_exported`, since it already knows the prior
    /// state).
    fn unexport_volume_unlocked(&self, volume: &mut Volume, reason: &str) -> Result<(), SvcError> {
        self.cancel_all_for(volume.id.as_str());
        for r in &volume.replication_settings {
            let registry = self.clone();
            let target = r.replication_target.clone();
            let volume_id = volume.id.clone();
            let reason = reason.to_string();
            tokio::spawn(async move {
                workers::replication::notify_stop(&registry, &target, &volume_id, &reason).await;
            });
        }
        volume.is_exported = false;
        volume.exported_host_id = None;
        volume.workload_size = None;
        self.facade()
            .replace("volume", &volume.id.to_string(), volume.clone())?;
        self.logger()
            .info(format!("volume {} unexported: {reason}", volume.id), false);
        Ok(())
    }
}

fn frequency_for(volume: &Volume, setting_id: &SettingId) -> u64 {
    volume.snapshot_settings.get(setting_id).copied().unwrap_or(0)
}

fn validate_setting_kind(kind: &SettingKind, system_id: &SystemId) -> Result<(), SvcError> {
    if let SettingKind::Replication {
        replication_type,
        delay_sec,
        replication_target,
    } = kind
    {
        let consistent = match replication_type {
            ReplicationType::Synchronous => *delay_sec == 0,
            ReplicationType::Asynchronous => *delay_sec > 0,
        };
        if !consistent {
            return InvalidArgumentSnafu {
                details: "delay_sec must be 0 for synchronous and > 0 for asynchronous replication",
            }
            .fail();
        }
        if &replication_target.id == system_id {
            return ReplicationTargetIsSelfSnafu.fail();
        }
    }
    Ok(())
}

/// Returns `<source_name>_<replication_type><source_system_name>`, the
/// mirror volume naming rule from I8.
pub fn mirror_volume_name(source_name: &str, replication_type: ReplicationType, source_system_name: &str) -> String {
    format!("{source_name}_{}{source_system_name}", replication_type.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use stor_port::ReplicationTarget;

    fn new_registry() -> Registry {
        let data_dir = tempfile::tempdir().unwrap();
        let registry_file = tempfile::NamedTempFile::new().unwrap();
        Registry::new(data_dir.path(), registry_file.path(), 5000).unwrap()
    }

    #[test]
    fn create_volume_rejects_single_volume_over_max_capacity() {
        let registry = new_registry();
        registry
            .create_system(CreateSystemOpts {
                max_throughput: None,
                max_capacity: Some(100),
            })
            .unwrap();
        let system = registry.get_system().unwrap();
        let err = registry
            .create_volume(&system.id, "too-big".into(), 200)
            .unwrap_err();
        assert!(matches!(err, SvcError::CapacityExceeded { .. }));
    }

    #[test]
    fn create_volume_rejects_once_budget_is_exhausted() {
        let registry = new_registry();
        registry
            .create_system(CreateSystemOpts {
                max_throughput: None,
                max_capacity: Some(100),
            })
            .unwrap();
        let system = registry.get_system().unwrap();
        registry.create_volume(&system.id, "first".into(), 80).unwrap();
        let err = registry
            .create_volume(&system.id, "second".into(), 30)
            .unwrap_err();
        assert!(matches!(err, SvcError::CapacityExceeded { .. }));
    }

    #[test]
    fn create_setting_rejects_replication_target_that_is_self() {
        let registry = new_registry();
        registry.create_system(CreateSystemOpts::default()).unwrap();
        let system = registry.get_system().unwrap();
        let kind = SettingKind::Replication {
            replication_type: ReplicationType::Asynchronous,
            delay_sec: 30,
            replication_target: ReplicationTarget {
                id: system.id.clone(),
                name: system.name.clone(),
            },
        };
        let err = registry
            .create_setting(CreateSettingRequest {
                name: "mirror-to-self".into(),
                kind,
            })
            .unwrap_err();
        assert!(matches!(err, SvcError::ReplicationTargetIsSelf));
    }

    #[test]
    fn create_setting_rejects_inconsistent_delay_sec() {
        let registry = new_registry();
        registry.create_system(CreateSystemOpts::default()).unwrap();
        let kind = SettingKind::Replication {
            replication_type: ReplicationType::Synchronous,
            delay_sec: 5,
            replication_target: ReplicationTarget {
                id: SystemId::new(),
                name: "far-array".into(),
            },
        };
        let err = registry
            .create_setting(CreateSettingRequest {
                name: "bad-sync".into(),
                kind,
            })
            .unwrap_err();
        assert!(matches!(err, SvcError::InvalidArgument { .. }));
    }

    #[test]
    fn update_volume_rejects_duplicate_replication_target() {
        let registry = new_registry();
        registry.create_system(CreateSystemOpts::default()).unwrap();
        let system = registry.get_system().unwrap();
        let volume = registry.create_volume(&system.id, "mirrored".into(), 10).unwrap();
        let target = ReplicationTarget {
            id: SystemId::new(),
            name: "far-array".into(),
        };
        let setting_a = registry
            .create_setting(CreateSettingRequest {
                name: "replicate-a".into(),
                kind: SettingKind::Replication {
                    replication_type: ReplicationType::Asynchronous,
                    delay_sec: 30,
                    replication_target: target.clone(),
                },
            })
            .unwrap();
        let setting_b = registry
            .create_setting(CreateSettingRequest {
                name: "replicate-b".into(),
                kind: SettingKind::Replication {
                    replication_type: ReplicationType::Asynchronous,
                    delay_sec: 60,
                    replication_target: target,
                },
            })
            .unwrap();
        let err = registry
            .update_volume(
                &volume.id,
                UpdateVolumeRequest {
                    setting_ids: vec![setting_a.id, setting_b.id],
                    snapshot_frequencies: vec![],
                },
            )
            .unwrap_err();
        assert!(matches!(err, SvcError::DuplicateReplicationTarget { .. }));
    }

    #[test]
    fn update_setting_rejects_retargeting_onto_another_settings_target() {
        let registry = new_registry();
        registry.create_system(CreateSystemOpts::default()).unwrap();
        let system = registry.get_system().unwrap();
        let volume = registry.create_volume(&system.id, "mirrored".into(), 10).unwrap();
        let target_a = ReplicationTarget {
            id: SystemId::new(),
            name: "array-a".into(),
        };
        let target_b = ReplicationTarget {
            id: SystemId::new(),
            name: "array-b".into(),
        };
        let setting_a = registry
            .create_setting(CreateSettingRequest {
                name: "replicate-a".into(),
                kind: SettingKind::Replication {
                    replication_type: ReplicationType::Asynchronous,
                    delay_sec: 30,
                    replication_target: target_a.clone(),
                },
            })
            .unwrap();
        let setting_b = registry
            .create_setting(CreateSettingRequest {
                name: "replicate-b".into(),
                kind: SettingKind::Replication {
                    replication_type: ReplicationType::Asynchronous,
                    delay_sec: 60,
                    replication_target: target_b,
                },
            })
            .unwrap();
        registry
            .update_volume(
                &volume.id,
                UpdateVolumeRequest {
                    setting_ids: vec![setting_a.id.clone(), setting_b.id.clone()],
                    snapshot_frequencies: vec![],
                },
            )
            .unwrap();

        let err = registry
            .update_setting(
                &setting_b.id,
                SettingKind::Replication {
                    replication_type: ReplicationType::Asynchronous,
                    delay_sec: 90,
                    replication_target: target_a,
                },
            )
            .unwrap_err();
        assert!(matches!(err, SvcError::DuplicateReplicationTarget { .. }));
    }

    #[test]
    fn delete_system_cascades_volumes_hosts_and_settings() {
        let registry = new_registry();
        registry.create_system(CreateSystemOpts::default()).unwrap();
        let system = registry.get_system().unwrap();
        let volume = registry.create_volume(&system.id, "vol".into(), 10).unwrap();
        let host = registry
            .create_host("app-host".into(), "database".into(), "iscsi".into())
            .unwrap();
        let setting = registry
            .create_setting(CreateSettingRequest {
                name: "hourly".into(),
                kind: SettingKind::Snapshot {
                    value: 3600,
                    max_snapshots: 5,
                },
            })
            .unwrap();

        registry.delete_system().unwrap();

        assert!(registry.get_system().is_err());
        assert!(registry.get_volume(&volume.id).is_err());
        assert!(registry.get_host(&host.id).is_err());
        assert!(registry.get_setting(&setting.id).is_err());
    }
}
