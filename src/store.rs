//! Persisted dump collection
//!
//! JSON-file-backed list of imported dumps with their last write status. The
//! engine never reads this store; callers load a record, feed its `data` to
//! the validator/executor, and persist the outcome via [`DumpStore::update_status`].

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome of the most recent write attempt for a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Success,
    Error,
    Pending,
}

/// One imported dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpRecord {
    pub id: String,
    pub name: String,
    /// Dump contents in the hex wire format
    pub data: String,
    /// Size in bytes
    pub size: usize,
    /// Unix epoch milliseconds
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_write_status: Option<WriteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_write_time: Option<i64>,
}

/// JSON-file-backed dump collection
pub struct DumpStore {
    path: PathBuf,
    dumps: Vec<DumpRecord>,
}

impl DumpStore {
    /// Open a store, creating an empty one if the file does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let dumps = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Vec::new()
        };

        info!(path = %path.display(), count = dumps.len(), "dump store opened");
        Ok(DumpStore { path, dumps })
    }

    /// Add a dump to the store
    ///
    /// The data must be well-formed hex; size is derived from it.
    pub fn save_dump(&mut self, name: &str, hex_data: &str) -> Result<&DumpRecord> {
        let bytes = hex::decode(hex_data)
            .map_err(|e| GuardError::CorruptHeader(format!("dump is not valid hex: {}", e)))?;

        let now = chrono::Utc::now().timestamp_millis();
        let record = DumpRecord {
            id: format!("{}-{}", now, self.dumps.len()),
            name: name.to_string(),
            data: hex_data.to_string(),
            size: bytes.len(),
            created_at: now,
            last_write_status: None,
            last_write_time: None,
        };

        debug!(id = %record.id, size = record.size, "saving dump");
        self.dumps.push(record);
        self.persist()?;
        Ok(self.dumps.last().expect("record just pushed"))
    }

    /// Remove a dump by id; returns whether a record was removed
    pub fn delete_dump(&mut self, id: &str) -> Result<bool> {
        let before = self.dumps.len();
        self.dumps.retain(|d| d.id != id);
        let removed = self.dumps.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Record the outcome of a write attempt for a dump
    pub fn update_status(&mut self, id: &str, status: WriteStatus) -> Result<bool> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut updated = false;

        for dump in &mut self.dumps {
            if dump.id == id {
                dump.last_write_status = Some(status);
                dump.last_write_time = Some(now);
                updated = true;
            }
        }

        if updated {
            self.persist()?;
        }
        Ok(updated)
    }

    pub fn get(&self, id: &str) -> Option<&DumpRecord> {
        self.dumps.iter().find(|d| d.id == id)
    }

    /// Most recently added dump
    pub fn last(&self) -> Option<&DumpRecord> {
        self.dumps.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DumpRecord> {
        self.dumps.iter()
    }

    pub fn len(&self) -> usize {
        self.dumps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dumps.is_empty()
    }

    /// Remove every record
    pub fn clear(&mut self) -> Result<()> {
        self.dumps.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.dumps)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MIFARE_1K_SIZE;

    #[test]
    fn test_save_and_get() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dumps.json");

        let mut store = DumpStore::open(&path).unwrap();
        let hex = "AB".repeat(MIFARE_1K_SIZE);
        let id = store.save_dump("office-badge", &hex).unwrap().id.clone();

        let record = store.get(&id).unwrap();
        assert_eq!(record.name, "office-badge");
        assert_eq!(record.size, 1024);
        assert!(record.last_write_status.is_none());
    }

    #[test]
    fn test_rejects_non_hex_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = DumpStore::open(dir.path().join("dumps.json")).unwrap();
        assert!(store.save_dump("bad", "not-hex-at-all").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dumps.json");
        let hex = "CD".repeat(32);

        let id = {
            let mut store = DumpStore::open(&path).unwrap();
            store.save_dump("transit-card", &hex).unwrap().id.clone()
        };

        let store = DumpStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().data, hex);
    }

    #[test]
    fn test_update_status_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dumps.json");

        let mut store = DumpStore::open(&path).unwrap();
        let id = store
            .save_dump("badge", &"00FF".repeat(256))
            .unwrap()
            .id
            .clone();

        assert!(store.update_status(&id, WriteStatus::Success).unwrap());
        assert!(!store.update_status("missing", WriteStatus::Error).unwrap());

        let reopened = DumpStore::open(&path).unwrap();
        let record = reopened.get(&id).unwrap();
        assert_eq!(record.last_write_status, Some(WriteStatus::Success));
        assert!(record.last_write_time.is_some());
    }

    #[test]
    fn test_delete_and_clear() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = DumpStore::open(dir.path().join("dumps.json")).unwrap();

        let id = store.save_dump("a", "00").unwrap().id.clone();
        store.save_dump("b", "11").unwrap();

        assert!(store.delete_dump(&id).unwrap());
        assert!(!store.delete_dump(&id).unwrap());
        assert_eq!(store.len(), 1);

        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_last_returns_most_recent() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = DumpStore::open(dir.path().join("dumps.json")).unwrap();
        store.save_dump("first", "00").unwrap();
        store.save_dump("second", "11").unwrap();
        assert_eq!(store.last().unwrap().name, "second");
    }
}
