use crate::ids::{HostId, SettingId, SnapshotId, SystemId, VolumeId};
use snafu::Snafu;

/// The coarse category an [`SvcError`] maps to at the HTTP boundary (§7).
///
/// Many concrete variants share a category; the category is derived, never
/// stored redundantly on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    InvalidArgument,
    CapacityExceeded,
    Precondition,
    Internal,
}

/// Engine-internal error type. One variant per condition that needs its own
/// message, grouped into an [`ErrorCategory`] only at the point a response is
/// rendered.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SvcError {
    #[snafu(display("a system already exists on this instance"))]
    SystemAlreadyExists,

    #[snafu(display("no system exists on this instance yet"))]
    SystemNotFound,

    #[snafu(display("host '{host_id}' not found"))]
    HostNotFound { host_id: HostId },

    #[snafu(display("a host named '{name}' already exists on system '{system_id}'"))]
    HostNameConflict { system_id: SystemId, name: String },

    #[snafu(display("host '{host_id}' is still referenced by an exported volume"))]
    HostStillReferenced { host_id: HostId },

    #[snafu(display("volume '{volume_id}' not found"))]
    VolumeNotFound { volume_id: VolumeId },

    #[snafu(display("setting '{setting_id}' not found"))]
    SettingNotFound { setting_id: SettingId },

    #[snafu(display("invalid setting id(s): {ids:?}"))]
    InvalidSettingIds { ids: Vec<String> },

    #[snafu(display("snapshot '{snapshot_id}' not found"))]
    SnapshotNotFound { snapshot_id: SnapshotId },

    #[snafu(display("invalid argument: {details}"))]
    InvalidArgument { details: String },

    #[snafu(display(
        "capacity exceeded: {used} + {requested} would exceed max_capacity {max}"
    ))]
    CapacityExceeded {
        used: u64,
        requested: u64,
        max: u64,
    },

    #[snafu(display("target system capacity would be exceeded"))]
    TargetCapacityExceeded,

    #[snafu(display("volume '{volume_id}' is already exported"))]
    VolumeAlreadyExported { volume_id: VolumeId },

    #[snafu(display("volume '{volume_id}' is not exported"))]
    VolumeNotExported { volume_id: VolumeId },

    #[snafu(display(
        "volume '{volume_id}' already has a replication setting targeting system '{target_id}'"
    ))]
    DuplicateReplicationTarget {
        volume_id: VolumeId,
        target_id: SystemId,
    },

    #[snafu(display("a replication target cannot be the source system itself"))]
    ReplicationTargetIsSelf,

    #[snafu(display("max_throughput and max_capacity are immutable after creation"))]
    ImmutableSystemField,

    #[snafu(display("failed to persist {collection}: {details}"))]
    Store { collection: String, details: String },

    #[snafu(display("internal error: {details}"))]
    Internal { details: String },
}

impl SvcError {
    /// Maps this error onto its wire-facing category (§7).
    pub fn category(&self) -> ErrorCategory {
        match self {
            SvcError::SystemNotFound
            | SvcError::HostNotFound { .. }
            | SvcError::VolumeNotFound { .. }
            | SvcError::SettingNotFound { .. }
            | SvcError::SnapshotNotFound { .. } => ErrorCategory::NotFound,

            SvcError::SystemAlreadyExists
            | SvcError::HostNameConflict { .. }
            | SvcError::DuplicateReplicationTarget { .. } => ErrorCategory::Conflict,

            SvcError::InvalidArgument { .. }
            | SvcError::InvalidSettingIds { .. }
            | SvcError::ReplicationTargetIsSelf
            | SvcError::ImmutableSystemField => ErrorCategory::InvalidArgument,

            SvcError::CapacityExceeded { .. } | SvcError::TargetCapacityExceeded => {
                ErrorCategory::CapacityExceeded
            }

            SvcError::VolumeAlreadyExported { .. }
            | SvcError::VolumeNotExported { .. }
            | SvcError::HostStillReferenced { .. } => ErrorCategory::Precondition,

            SvcError::Store { .. } | SvcError::Internal { .. } => ErrorCategory::Internal,
        }
    }
}
