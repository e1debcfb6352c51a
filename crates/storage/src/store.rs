// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Crash-safe state persistence: write-tempfile-then-rename for snapshots,
//! append-only JSONL for event/ledger logs.

use crate::error::StorageError;
use crate::lock::FileLock;
use ouro_core::{Config, QueueSnapshot, SupervisorState};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOCK_STALENESS: Duration = Duration::from_secs(10);
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct StateStore {
    data_dir: PathBuf,
}

impl StateStore {
    pub fn new(cfg: &Config) -> Self {
        Self { data_dir: cfg.data_dir.clone() }
    }

    fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }

    fn queue_path(&self) -> PathBuf {
        self.data_dir.join("queue.json")
    }

    fn lock_path(&self, for_file: &Path) -> PathBuf {
        let name = for_file.file_name().and_then(|n| n.to_str()).unwrap_or("store");
        self.data_dir.join("locks").join(format!("{name}.lock"))
    }

    /// A missing snapshot file loads as `SupervisorState::default()`.
    pub fn load(&self) -> Result<SupervisorState, StorageError> {
        load_json_or_default(&self.state_path())
    }

    pub fn save(&self, state: &SupervisorState) -> Result<(), StorageError> {
        let path = self.state_path();
        let lock_path = self.lock_path(&path);
        ensure_parent(&lock_path)?;
        let _lock = FileLock::acquire(&lock_path, LOCK_STALENESS, LOCK_TIMEOUT)?;
        write_atomic(&path, state)
    }

    pub fn load_queue_snapshot(&self) -> Result<QueueSnapshot, StorageError> {
        load_json_or_default(&self.queue_path())
    }

    pub fn save_queue_snapshot(&self, snapshot: &QueueSnapshot) -> Result<(), StorageError> {
        let path = self.queue_path();
        let lock_path = self.lock_path(&path);
        ensure_parent(&lock_path)?;
        let _lock = FileLock::acquire(&lock_path, LOCK_STALENESS, LOCK_TIMEOUT)?;
        write_atomic(&path, snapshot)
    }

    /// Appends one JSON-serialized record per line. Tolerates a partial
    /// final line on read (see `read_jsonl`); never tolerates one on write —
    /// each append is a single `write_all` of a complete line.
    pub fn append_jsonl(&self, path: &Path, record: &impl Serialize) -> Result<(), StorageError> {
        ensure_parent(path)?;
        let line = serde_json::to_string(record).map_err(StorageError::Serialize)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path).map_err(|e| StorageError::io(path, e))?;
        writeln!(file, "{line}").map_err(|e| StorageError::io(path, e))?;
        Ok(())
    }

    /// Reads every complete line in a JSONL file, silently skipping a
    /// trailing partial line (the writer was killed mid-append).
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>, StorageError> {
        let Ok(file) = std::fs::File::open(path) else { return Ok(Vec::new()) };
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| StorageError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => out.push(record),
                Err(_) => break, // partial trailing line from a killed writer
            }
        }
        Ok(out)
    }

    /// Rotates `path` to `path.1` (overwriting any prior `.1`) once it
    /// exceeds `max_bytes`. Called at the top of each supervisor tick for
    /// the chat/supervisor logs.
    pub fn rotate_if_needed(&self, path: &Path, max_bytes: u64) -> Result<bool, StorageError> {
        let Ok(meta) = std::fs::metadata(path) else { return Ok(false) };
        if meta.len() <= max_bytes {
            return Ok(false);
        }
        let rotated = path.with_extension(format!("{}.1", path.extension().and_then(|e| e.to_str()).unwrap_or("log")));
        std::fs::rename(path, &rotated).map_err(|e| StorageError::io(path, e))?;
        Ok(true)
    }
}

fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    Ok(())
}

fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(|source| StorageError::Deserialize { path: path.to_path_buf(), source }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

pub(crate) fn write_atomic(path: &Path, value: &impl Serialize) -> Result<(), StorageError> {
    ensure_parent(path)?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let json = serde_json::to_string_pretty(value).map_err(StorageError::Serialize)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| StorageError::io(parent, e))?;
    tmp.write_all(json.as_bytes()).map_err(|e| StorageError::io(path, e))?;
    tmp.persist(path).map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ouro_core::TaskBuilder;

    fn cfg_in(dir: &Path) -> Config {
        Config { data_dir: dir.to_path_buf(), ..Config::default() }
    }

    #[test]
    fn missing_state_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(&cfg_in(dir.path()));
        let state = store.load().unwrap();
        assert_eq!(state, SupervisorState::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(&cfg_in(dir.path()));
        let mut state = SupervisorState::default();
        state.spent_usd = 3.5;
        state.owner_id = "owner-1".to_string();
        store.save(&state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn queue_snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(&cfg_in(dir.path()));
        let mut snapshot = QueueSnapshot::default();
        snapshot.pending.push(TaskBuilder::new(ouro_core::TaskType::Task).build());
        store.save_queue_snapshot(&snapshot).unwrap();
        let loaded = store.load_queue_snapshot().unwrap();
        assert_eq!(loaded.pending.len(), 1);
    }

    #[test]
    fn jsonl_append_and_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(&cfg_in(dir.path()));
        let path = dir.path().join("log.jsonl");
        store.append_jsonl(&path, &serde_json::json!({"a": 1})).unwrap();
        store.append_jsonl(&path, &serde_json::json!({"a": 2})).unwrap();
        let records: Vec<serde_json::Value> = store.read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["a"], 2);
    }

    #[test]
    fn jsonl_read_skips_partial_trailing_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(&cfg_in(dir.path()));
        let path = dir.path().join("log.jsonl");
        std::fs::write(&path, b"{\"a\":1}\n{\"a\":2\n").unwrap();
        let records: Vec<serde_json::Value> = store.read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn rotate_if_needed_moves_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.log");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        let store = StateStore::new(&cfg_in(dir.path()));
        let rotated = store.rotate_if_needed(&path, 10).unwrap();
        assert!(rotated);
        assert!(!path.exists());
    }
}
