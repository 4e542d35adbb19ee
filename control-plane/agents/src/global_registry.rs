//! Client for the shared, cross-process `global_systems.json` registry (§9
//! "Shared cross-process registry").
//!
//! Unlike the per-instance collections in [`crate::persistence::Facade`],
//! this file is touched by every running instance. There's no file-locking
//! crate in this dependency tree, so contention is handled the way the spec
//! allows: read-modify-write with a small bounded retry, last-write-wins on
//! persistent conflict.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use stor_port::RegistryEntry;

const MAX_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

pub struct GlobalRegistry {
    path: PathBuf,
}

impl GlobalRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Vec<RegistryEntry> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    fn write(&self, entries: &[RegistryEntry]) -> std::io::Result<()> {
        let tmp = self.path.with_extension(format!("json.tmp-{}", std::process::id()));
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries).unwrap_or_default())?;
        std::fs::rename(&tmp, &self.path)
    }

    pub fn all(&self) -> Vec<RegistryEntry> {
        self.read()
    }

    pub fn lookup(&self, system_id: &str) -> Option<RegistryEntry> {
        self.read().into_iter().find(|e| e.id.as_str() == system_id)
    }

    /// Adds or replaces this instance's entry.
    pub fn upsert(&self, entry: RegistryEntry) {
        for attempt in 0..MAX_ATTEMPTS {
            let mut entries = self.read();
            entries.retain(|e| e.id != entry.id);
            entries.push(entry.clone());
            if self.write(&entries).is_ok() {
                return;
            }
            thread::sleep(RETRY_BACKOFF * (attempt + 1));
        }
        tracing::warn!(system_id = %entry.id, "failed to upsert global registry entry after retries");
    }

    /// Removes this instance's entry, tolerating races with concurrent
    /// writers (best-effort; last-write-wins per §9).
    pub fn remove(&self, system_id: &str) {
        for attempt in 0..MAX_ATTEMPTS {
            let mut entries = self.read();
            entries.retain(|e| e.id.as_str() != system_id);
            if self.write(&entries).is_ok() {
                return;
            }
            thread::sleep(RETRY_BACKOFF * (attempt + 1));
        }
        tracing::warn!(system_id, "failed to remove global registry entry after retries");
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
