use crate::ids::{HostId, SettingId, SnapshotId, SystemId, VolumeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{AsRefStr, EnumString};

/// Anything storable in a Façade collection is identified by a plain string.
/// The Façade deals in JSON values; `HasId` is how it finds the key field
/// without knowing the concrete record type.
pub trait HasId {
    fn id(&self) -> String;
}

macro_rules! impl_has_id {
    ($ty:ty, $field:ident) => {
        impl HasId for $ty {
            fn id(&self) -> String {
                self.$field.to_string()
            }
        }
    };
}

/// A single simulated storage array, scoped to one instance (I1).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct System {
    pub id: SystemId,
    pub name: String,
    pub max_throughput: f64,
    pub max_capacity: u64,
}
impl_has_id!(System, id);

/// A named client endpoint a volume may be exported to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Host {
    pub id: HostId,
    pub system_id: SystemId,
    pub name: String,
    pub application_type: String,
    pub protocol: String,
}
impl_has_id!(Host, id);

/// `synchronous ⇔ delay_sec = 0` (I5).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReplicationType {
    Synchronous,
    Asynchronous,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReplicationTarget {
    pub id: SystemId,
    pub name: String,
}

/// A replication setting as applied to a particular volume (I3, I4).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VolumeReplicationSetting {
    pub setting_id: SettingId,
    pub replication_type: ReplicationType,
    pub delay_sec: u64,
    pub replication_target: ReplicationTarget,
}

/// A provisioned unit of storage, optionally exported to a host (I6).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Volume {
    pub id: VolumeId,
    pub system_id: SystemId,
    pub name: String,
    pub size: u64,
    pub is_exported: bool,
    pub exported_host_id: Option<HostId>,
    pub workload_size: Option<u64>,
    /// setting_id -> frequency_sec, the setting's own configured value.
    pub snapshot_settings: HashMap<SettingId, u64>,
    pub snapshot_frequencies: Vec<u64>,
    pub replication_settings: Vec<VolumeReplicationSetting>,
    pub snapshot_count: u64,
}
impl_has_id!(Volume, id);

impl Volume {
    pub fn new(id: VolumeId, system_id: SystemId, name: String, size: u64) -> Self {
        Self {
            id,
            system_id,
            name,
            size,
            is_exported: false,
            exported_host_id: None,
            workload_size: None,
            snapshot_settings: HashMap::new(),
            snapshot_frequencies: Vec::new(),
            replication_settings: Vec::new(),
            snapshot_count: 0,
        }
    }

    /// `true` once nothing else references `setting_id` (used by callers
    /// deciding whether a setting may now be deleted).
    pub fn references_setting(&self, setting_id: &SettingId) -> bool {
        self.snapshot_settings.contains_key(setting_id)
            || self
                .replication_settings
                .iter()
                .any(|r| &r.setting_id == setting_id)
    }
}

/// A point-in-time copy of a volume, owned by it (I2).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub volume_id: VolumeId,
    pub snapshot_setting_id: SettingId,
    pub created_at: DateTime<Utc>,
    pub frequency_sec: u64,
    pub size: u64,
}
impl_has_id!(Snapshot, id);

fn default_max_snapshots() -> u32 {
    10
}

/// A snapshot or replication policy, applied to volumes by reference.
///
/// A tagged sum type rather than a duck-typed bag of optional fields: the
/// wire boundary validates into this and rejects unknown shapes with
/// `InvalidArgument` (§9 design notes).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SettingKind {
    Snapshot {
        value: u64,
        #[serde(default = "default_max_snapshots")]
        max_snapshots: u32,
    },
    Replication {
        replication_type: ReplicationType,
        delay_sec: u64,
        replication_target: ReplicationTarget,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Setting {
    pub id: SettingId,
    pub system_id: SystemId,
    pub name: String,
    #[serde(flatten)]
    pub kind: SettingKind,
}
impl_has_id!(Setting, id);

impl Setting {
    pub fn is_snapshot(&self) -> bool {
        matches!(self.kind, SettingKind::Snapshot { .. })
    }
    pub fn is_replication(&self) -> bool {
        matches!(self.kind, SettingKind::Replication { .. })
    }
}

/// An entry in the process-wide shared registry (§4, Instance Registry Entry).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub id: SystemId,
    pub name: String,
    pub port: u16,
}
impl_has_id!(RegistryEntry, id);

/// Derived, system-wide metrics, recomputed only by `recompute_metrics` (§9).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct SystemMetrics {
    pub throughput_used: f64,
    pub capacity_used: u64,
    pub saturation: f64,
    pub cpu_usage: f64,
    pub volume_capacity: u64,
    pub snapshot_capacity: u64,
    pub capacity_percentage: f64,
    pub current_latency: f64,
}

/// One workload sample appended by the Workload Generator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IoSample {
    pub timestamp: DateTime<Utc>,
    pub volume_id: VolumeId,
    pub host_id: HostId,
    pub iops: u32,
    pub latency: f64,
    pub throughput: f64,
}

/// A send- or receive-side replication sample for one `(volume, target)` or
/// `(volume, "received_from_<sender>")` pair, overwritten each cycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReplicationMetricRecord {
    pub volume_id: VolumeId,
    pub target_key: String,
    pub throughput: f64,
    pub latency: f64,
    pub iops: Option<u32>,
    pub replication_type: Option<ReplicationType>,
    pub timestamp: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
