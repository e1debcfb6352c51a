// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Public home of [`Config`]; the struct itself lives in `ouro_core::config`
//! so `ouro_core::queue` and `ouro_git` can use it without a dependency
//! cycle back onto this crate.

pub use ouro_core::config::Config;

/// Loads `Config` from `<data_dir>/settings.json`, falling back to defaults
/// for any missing field (and for the file entirely). Mirrors the
/// settings-lock-then-write-temp-then-rename discipline the rest of the
/// storage layer uses, via `ouro_storage::store::StateStore`'s atomic writer.
pub fn load(data_dir: impl Into<std::path::PathBuf>) -> Config {
    let data_dir = data_dir.into();
    let settings_path = data_dir.join("settings.json");
    let mut cfg = match std::fs::read_to_string(&settings_path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    };
    cfg.data_dir = data_dir;
    cfg
}

pub fn save(cfg: &Config) -> Result<(), ouro_storage::StorageError> {
    let path = cfg.settings_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ouro_storage::StorageError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(cfg).map_err(ouro_storage::StorageError::Serialize)?;
    let mut tmp = tempfile::NamedTempFile::new_in(path.parent().unwrap_or(std::path::Path::new("."))).map_err(|e| ouro_storage::StorageError::io(&path, e))?;
    use std::io::Write;
    tmp.write_all(json.as_bytes()).map_err(|e| ouro_storage::StorageError::io(&path, e))?;
    tmp.persist(&path).map_err(|e| ouro_storage::StorageError::io(&path, e.error))?;
    Ok(())
}
