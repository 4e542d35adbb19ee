//! Shared resource model, wire types, and error taxonomy for the array
//! simulator. Kept dependency-light and free of any transport or storage
//! concern: `agents` and `rest` both depend on this crate for a common
//! vocabulary, the way the teacher's own `stor-port` crate anchors its
//! workspace.

pub mod error;
pub mod ids;
pub mod types;

pub use error::{ErrorCategory, SvcError};
pub use ids::{HostId, SettingId, SnapshotId, SystemId, VolumeId};
pub use types::*;
