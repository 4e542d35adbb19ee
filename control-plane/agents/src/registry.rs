//! The engine's top-level shared state, following the teacher's
//! `Registry` / `ResourceSpecsLocked` split: [`Registry`] owns the façade,
//! the logger, the global-registry client, and the in-memory worker task
//! table; [`ResourceSpecsLocked`] (in `specs.rs`) is a thin lock held across
//! check-then-act sequences so invariant checks and their writes don't race
//! each other within one process.

use crate::global_registry::GlobalRegistry;
use crate::logger::Logger;
use crate::persistence::Facade;
use parking_lot::Mutex;
use shutdown::{Shutdown, ShutdownHandle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stor_port::{SettingId, SystemId};

/// What role a background task plays for a given entity; part of the task
/// table key (§9 "Task bookkeeping is a mapping `(entity_id, role) →
/// cancellation_handle`").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Workload,
    Snapshot(u64),
    ReplicationCoordinator,
    Replication(SystemId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TaskKey {
    entity_id: String,
    role: Role,
}

/// Shared engine state. Cheap to clone (everything behind an `Arc`); handed
/// to every HTTP handler and every spawned worker.
#[derive(Clone)]
pub struct Registry {
    facade: Arc<Facade>,
    logger: Arc<Logger>,
    global_registry: Arc<GlobalRegistry>,
    tasks: Arc<Mutex<HashMap<TaskKey, ShutdownHandle>>>,
    /// Serializes invariant check-then-write sequences (I1-I8) so two
    /// concurrent requests against this instance can't both pass a check
    /// before either one writes.
    specs_lock: Arc<Mutex<()>>,
    http: reqwest::Client,
    pub port: u16,
}

impl Registry {
    pub fn new(
        data_dir: impl Into<std::path::PathBuf>,
        global_registry_path: impl Into<std::path::PathBuf>,
        port: u16,
    ) -> std::io::Result<Self> {
        let data_dir = data_dir.into();
        let facade = Facade::new(&data_dir)?;
        let logger = Logger::new(&data_dir, port);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("reqwest client builds with static config");
        Ok(Self {
            facade: Arc::new(facade),
            logger: Arc::new(logger),
            global_registry: Arc::new(GlobalRegistry::new(global_registry_path)),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            specs_lock: Arc::new(Mutex::new(())),
            http,
            port,
        })
    }

    pub fn facade(&self) -> &Facade {
        &self.facade
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn global_registry(&self) -> &GlobalRegistry {
        &self.global_registry
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Held across a single invariant check-then-persist sequence.
    pub fn lock_specs(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.specs_lock.lock()
    }

    /// Registers a new worker, returning the `Shutdown` handle its loop
    /// should poll. Replaces (and implicitly cancels) any prior task under
    /// the same key.
    pub fn spawn_task(&self, entity_id: impl Into<String>, role: Role) -> Shutdown {
        let key = TaskKey {
            entity_id: entity_id.into(),
            role,
        };
        let (handle, shutdown) = shutdown::pair();
        let mut tasks = self.tasks.lock();
        if let Some(prior) = tasks.insert(key, handle) {
            prior.cancel();
        }
        shutdown
    }

    /// Signals the worker at `(entity_id, role)` to stop, if one exists.
    pub fn cancel_task(&self, entity_id: &str, role: &Role) {
        if let Some(handle) = self.tasks.lock().get(&TaskKey {
            entity_id: entity_id.to_string(),
            role: role.clone(),
        }) {
            handle.cancel();
        }
    }

    /// Cancels every task whose key's `entity_id` is `entity_id`, regardless
    /// of role. Used for volume/host/system cascade teardown (§9 ordered
    /// teardown: workers -> local state -> outbound notifications ->
    /// persisted state).
    pub fn cancel_all_for(&self, entity_id: &str) {
        let tasks = self.tasks.lock();
        for (key, handle) in tasks.iter() {
            if key.entity_id == entity_id {
                handle.cancel();
            }
        }
    }

    /// Removes tombstoned (cancelled) entries so the table doesn't grow
    /// unboundedly across the life of a long-running instance.
    pub fn reap_cancelled(&self) {
        self.tasks.lock().retain(|_, handle| !handle.is_cancelled());
    }

    pub fn active_roles_for(&self, entity_id: &str) -> Vec<Role> {
        self.tasks
            .lock()
            .iter()
            .filter(|(key, handle)| key.entity_id == entity_id && !handle.is_cancelled())
            .map(|(key, _)| key.role.clone())
            .collect()
    }
}

/// Helper shared by workers deriving the mirror volume name (I8) and by
/// `specs.rs` when validating a replication target.
pub fn setting_targets_self(source: &SystemId, target: &SystemId) -> bool {
    source == target
}

/// Helper used by `update_volume`/`update_setting` to express the set
/// difference between a volume's currently-applied settings and a requested
/// list, without pulling in an external set-diff crate.
pub fn setting_diff<'a>(
    current: impl IntoIterator<Item = &'a SettingId>,
    requested: impl IntoIterator<Item = &'a SettingId>,
) -> (Vec<SettingId>, Vec<SettingId>) {
    let current: Vec<SettingId> = current.into_iter().cloned().collect();
    let requested: Vec<SettingId> = requested.into_iter().cloned().collect();
    let removed = current
        .iter()
        .filter(|id| !requested.contains(id))
        .cloned()
        .collect();
    let added = requested
        .iter()
        .filter(|id| !current.contains(id))
        .cloned()
        .collect();
    (removed, added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_diff_computes_added_and_removed() {
        let current = vec![SettingId::from("a"), SettingId::from("b")];
        let requested = vec![SettingId::from("b"), SettingId::from("c")];
        let (removed, added) = setting_diff(current.iter(), requested.iter());
        assert_eq!(removed, vec![SettingId::from("a")]);
        assert_eq!(added, vec![SettingId::from("c")]);
    }
}
