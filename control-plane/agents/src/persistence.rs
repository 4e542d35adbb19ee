//! Per-instance JSON file store.
//!
//! One named collection per file under the instance's data directory. Reads
//! return an empty container rather than erroring when the file is absent;
//! writes go through a sibling temp file and `rename` so a reader never
//! observes a partial write (§4.1).

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stor_port::SvcError;

/// Guards writes to one collection file so concurrent callers within this
/// process serialize rather than interleave.
type CollectionLock = Arc<Mutex<()>>;

/// A per-instance JSON file store, one file per named collection.
///
/// Mirrors the teacher's pattern of a small guarded registry of locks rather
/// than locking the whole store for unrelated collections.
pub struct Facade {
    dir: PathBuf,
    locks: Mutex<HashMap<String, CollectionLock>>,
}

impl Facade {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    fn lock_for(&self, collection: &str) -> CollectionLock {
        self.locks
            .lock()
            .entry(collection.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns the collection's full contents, or the `Default` value if the
    /// file is absent or fails to parse (a parse failure is logged by the
    /// caller, not here — this module has no opinion on the instance logger).
    pub fn load<T: DeserializeOwned + Default>(&self, collection: &str) -> T {
        let path = self.path(collection);
        let _guard = self.lock_for(collection).lock();
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => T::default(),
        }
    }

    /// Returns a collection's raw JSON, for the generic `/data/<collection>`
    /// passthrough route. Absent or unparsable files read back as an empty
    /// array, matching every other collection's "empty if absent" rule.
    pub fn load_raw(&self, collection: &str) -> serde_json::Value {
        let path = self.path(collection);
        let _guard = self.lock_for(collection).lock();
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|_| serde_json::json!([])),
            Err(_) => serde_json::json!([]),
        }
    }

    /// Replaces the entire collection file.
    pub fn overwrite<T: Serialize>(&self, collection: &str, value: &T) -> Result<(), SvcError> {
        let _guard = self.lock_for(collection).lock();
        self.write_locked(collection, value)
    }

    fn write_locked<T: Serialize>(&self, collection: &str, value: &T) -> Result<(), SvcError> {
        let path = self.path(collection);
        let tmp = path.with_extension(format!("json.tmp-{}", std::process::id()));
        let bytes =
            serde_json::to_vec_pretty(value).map_err(|e| stor_port::error::InternalSnafu {
                details: e.to_string(),
            }.build())?;
        std::fs::write(&tmp, bytes).map_err(|e| {
            stor_port::error::StoreSnafu {
                collection: collection.to_string(),
                details: e.to_string(),
            }
            .build()
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            stor_port::error::StoreSnafu {
                collection: collection.to_string(),
                details: e.to_string(),
            }
            .build()
        })
    }

    /// Appends `record` to a list-valued collection keyed by `id`. Fails if a
    /// record with the same id already exists.
    pub fn append<T>(&self, collection: &str, id: &str, record: T) -> Result<(), SvcError>
    where
        T: Serialize + DeserializeOwned + stor_port::HasId,
    {
        let _guard = self.lock_for(collection).lock();
        let mut items: Vec<T> = self.load_locked(collection);
        if items.iter().any(|r| r.id() == id) {
            return Err(stor_port::error::StoreSnafu {
                collection: collection.to_string(),
                details: format!("record '{id}' already exists"),
            }
            .build());
        }
        items.push(record);
        self.write_locked(collection, &items)
    }

    /// Pushes `record` onto a list-valued collection with no id-uniqueness
    /// check, for streams that are append-only by nature (`io_metrics`).
    pub fn push<T>(&self, collection: &str, record: T) -> Result<(), SvcError>
    where
        T: Serialize + DeserializeOwned,
    {
        let _guard = self.lock_for(collection).lock();
        let mut items: Vec<T> = self.load_locked(collection);
        items.push(record);
        self.write_locked(collection, &items)
    }

    /// Overwrites the record matching `id`; no-op if absent.
    pub fn replace<T>(&self, collection: &str, id: &str, record: T) -> Result<(), SvcError>
    where
        T: Serialize + DeserializeOwned + stor_port::HasId,
    {
        let _guard = self.lock_for(collection).lock();
        let mut items: Vec<T> = self.load_locked(collection);
        if let Some(slot) = items.iter_mut().find(|r| r.id() == id) {
            *slot = record;
        }
        self.write_locked(collection, &items)
    }

    /// Removes the record matching `id`, or clears the whole collection when
    /// `id` is `None`. Fails if the id is still present after removal.
    pub fn delete<T>(&self, collection: &str, id: Option<&str>) -> Result<(), SvcError>
    where
        T: Serialize + DeserializeOwned + stor_port::HasId,
    {
        let _guard = self.lock_for(collection).lock();
        match id {
            None => self.write_locked(collection, &Vec::<T>::new()),
            Some(id) => {
                let mut items: Vec<T> = self.load_locked(collection);
                items.retain(|r| r.id() != id);
                if items.iter().any(|r| r.id() == id) {
                    return Err(stor_port::error::StoreSnafu {
                        collection: collection.to_string(),
                        details: format!("record '{id}' still present after delete"),
                    }
                    .build());
                }
                self.write_locked(collection, &items)
            }
        }
    }

    fn load_locked<T: DeserializeOwned + Default>(&self, collection: &str) -> T {
        let path = self.path(collection);
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => T::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
    struct Rec {
        id: String,
        value: u32,
    }
    impl stor_port::HasId for Rec {
        fn id(&self) -> String {
            self.id.clone()
        }
    }

    #[test]
    fn load_absent_returns_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let facade = Facade::new(tmp.path()).unwrap();
        let items: Vec<Rec> = facade.load("widgets");
        assert!(items.is_empty());
    }

    #[test]
    fn append_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let facade = Facade::new(tmp.path()).unwrap();
        facade
            .append(
                "widgets",
                "a",
                Rec {
                    id: "a".into(),
                    value: 1,
                },
            )
            .unwrap();
        let items: Vec<Rec> = facade.load("widgets");
        assert_eq!(items, vec![Rec { id: "a".into(), value: 1 }]);
    }

    #[test]
    fn append_duplicate_id_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let facade = Facade::new(tmp.path()).unwrap();
        facade
            .append("widgets", "a", Rec { id: "a".into(), value: 1 })
            .unwrap();
        let err = facade.append("widgets", "a", Rec { id: "a".into(), value: 2 });
        assert!(err.is_err());
    }

    #[test]
    fn replace_updates_matching_record() {
        let tmp = tempfile::tempdir().unwrap();
        let facade = Facade::new(tmp.path()).unwrap();
        facade
            .append("widgets", "a", Rec { id: "a".into(), value: 1 })
            .unwrap();
        facade
            .replace("widgets", "a", Rec { id: "a".into(), value: 9 })
            .unwrap();
        let items: Vec<Rec> = facade.load("widgets");
        assert_eq!(items, vec![Rec { id: "a".into(), value: 9 }]);
    }

    #[test]
    fn delete_single_removes_only_that_id() {
        let tmp = tempfile::tempdir().unwrap();
        let facade = Facade::new(tmp.path()).unwrap();
        facade.append("widgets", "a", Rec { id: "a".into(), value: 1 }).unwrap();
        facade.append("widgets", "b", Rec { id: "b".into(), value: 2 }).unwrap();
        facade.delete::<Rec>("widgets", Some("a")).unwrap();
        let items: Vec<Rec> = facade.load("widgets");
        assert_eq!(items, vec![Rec { id: "b".into(), value: 2 }]);
    }

    #[test]
    fn delete_none_clears_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let facade = Facade::new(tmp.path()).unwrap();
        facade.append("widgets", "a", Rec { id: "a".into(), value: 1 }).unwrap();
        facade.delete::<Rec>("widgets", None).unwrap();
        let items: Vec<Rec> = facade.load("widgets");
        assert!(items.is_empty());
    }
}
