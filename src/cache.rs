//! Persistence of parsed track tables between runs.

use dashmap::DashMap;
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::track_table::TrackTable;

/// Key-value store for parsed track tables. Keys are derived from the video's
/// frame-name prefix.
pub trait TableCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<TrackTable>>;
    fn put(&self, key: &str, table: &TrackTable) -> Result<()>;
}

/// Tables serialized as JSON files in a directory, one file per key.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}annotation.json", key))
    }
}

impl TableCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<TrackTable>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path).map_err(Error::io(&path))?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(table) => {
                debug!("Loaded cached table from {}", path.display());
                Ok(Some(table))
            }
            Err(e) => {
                warn!(
                    "Ignoring unreadable cache entry {}: {}",
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn put(&self, key: &str, table: &TrackTable) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(Error::io(&self.dir))?;
        let path = self.path_for(key);
        write_json(&path, table)
    }
}

fn write_json(path: &Path, table: &TrackTable) -> Result<()> {
    let file = File::create(path).map_err(Error::io(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, table)?;
    writer.flush().map_err(Error::io(path))
}

/// In-process cache. The first `put` for a key wins, later ones are ignored.
#[derive(Debug, Default)]
pub struct MemoryCache {
    tables: DashMap<String, TrackTable>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<TrackTable>> {
        Ok(self.tables.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &str, table: &TrackTable) -> Result<()> {
        self.tables
            .entry(key.to_string())
            .or_insert_with(|| table.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn table(text: &str) -> TrackTable {
        TrackTable::parse(Cursor::new(text), Path::new("log")).unwrap()
    }

    #[test]
    fn file_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("store"));
        assert!(cache.get("nexus_video0_").unwrap().is_none());

        let parsed = table("0 1 2 3 4 1 0 0 0 \"Bus\"\n");
        cache.put("nexus_video0_", &parsed).unwrap();
        assert!(cache.path_for("nexus_video0_").exists());
        assert_eq!(cache.get("nexus_video0_").unwrap(), Some(parsed));
        assert!(cache.get("nexus_video1_").unwrap().is_none());
    }

    #[test]
    fn memory_cache_keeps_first_table() {
        let cache = MemoryCache::new();
        let first = table("0 1 2 3 4 1 0 0 0 \"Bus\"\n");
        let second = table("0 1 2 3 4 2 0 0 0 \"Car\"\n");
        cache.put("a", &first).unwrap();
        cache.put("a", &second).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap(), Some(first));
    }
}
