//! Snapshot persistence for the in-memory ordered-set stores.
//!
//! Snapshots are MessagePack-encoded and written through a temporary file in
//! the target directory, then renamed into place so a crash never leaves a
//! half-written snapshot behind.

use super::store::ScoredMember;
use crate::core::{GraphError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One ordered set, members in score order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetSnapshot {
    pub members: Vec<ScoredMember>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Every live key of a single store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub sets: BTreeMap<String, SetSnapshot>,
}

/// All stores of a process, keyed by endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub stores: BTreeMap<String, StoreSnapshot>,
}

impl ClusterSnapshot {
    pub fn new(stores: BTreeMap<String, StoreSnapshot>) -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            taken_at: Utc::now(),
            stores,
        }
    }

    pub fn key_count(&self) -> usize {
        self.stores.values().map(|store| store.sets.len()).sum()
    }
}

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }

    pub fn save(&self, snapshot: &ClusterSnapshot) -> Result<()> {
        let parent = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| {
            GraphError::Snapshot(format!("Failed to create snapshot directory: {}", e))
        })?;

        let serialized = rmp_serde::to_vec_named(snapshot)
            .map_err(|e| GraphError::Snapshot(format!("Failed to serialize snapshot: {}", e)))?;
        let mut temp = NamedTempFile::new_in(&parent)
            .map_err(|e| GraphError::Snapshot(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(&serialized)
            .map_err(|e| GraphError::Snapshot(format!("Failed to write snapshot: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| GraphError::Snapshot(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| GraphError::Snapshot(format!("Failed to rename snapshot: {}", e)))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<ClusterSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.snapshot_path)
            .map_err(|e| GraphError::Snapshot(format!("Failed to read snapshot: {}", e)))?;
        let snapshot: ClusterSnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| GraphError::Snapshot(format!("Failed to deserialize snapshot: {}", e)))?;
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(GraphError::Snapshot(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ClusterSnapshot {
        let mut sets = BTreeMap::new();
        sets.insert(
            "connections:100".to_string(),
            SetSnapshot {
                members: vec![ScoredMember::new("200", 200.0), ScoredMember::new("300", 300.0)],
                expires_at: None,
            },
        );
        let mut stores = BTreeMap::new();
        stores.insert("store-a:6379".to_string(), StoreSnapshot { sets });
        ClusterSnapshot::new(stores)
    }

    #[test]
    fn save_and_load_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::new(temp_dir.path().join("nested").join("graph.snapshot"));
        assert!(!manager.exists());
        assert!(manager.load().unwrap().is_none());

        let snapshot = sample();
        manager.save(&snapshot).unwrap();
        assert!(manager.exists());

        let loaded = manager.load().unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.key_count(), 1);
    }

    #[test]
    fn load_rejects_unknown_version() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::new(temp_dir.path().join("graph.snapshot"));
        let mut snapshot = sample();
        snapshot.version = 99;
        manager.save(&snapshot).unwrap();

        assert!(matches!(manager.load(), Err(GraphError::Snapshot(_))));
    }
}
