//! Progress state persistence with file locking.
//!
//! Stores the per-exercise progress aggregates and accepted 1RMs as one JSON
//! document, written atomically and read under a shared lock. Read-modify-write
//! cycles are serialized through an exclusive lock on a `.lock` sidecar file.

use crate::{Error, ProgressState, Result};
use chrono::Utc;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

impl ProgressState {
    /// Load progress state from a file with shared locking
    ///
    /// Returns default state if file doesn't exist.
    /// If file is corrupted, logs a warning and returns default state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No progress file found, starting fresh");
            return Ok(Self::default());
        }

        let contents = match read_locked(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Unable to read progress file {:?}: {}. Using defaults.", path, e);
                return Ok(Self::default());
            }
        };

        match serde_json::from_str::<ProgressState>(&contents) {
            Ok(state) => {
                tracing::debug!(
                    "Loaded progress for {} exercises ({} maxes) from {:?}",
                    state.progress.len(),
                    state.maxes.len(),
                    path
                );
                Ok(state)
            }
            Err(e) => {
                tracing::warn!("Progress file {:?} is corrupt: {}. Using defaults.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save progress state atomically (temp file, fsync, rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("progress path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved progress state to {:?}", path);
        Ok(())
    }

    /// Load state, modify it, and save it back
    ///
    /// Holds an exclusive lock on `<path>.lock` for the whole cycle, so
    /// concurrent updates apply one after another. A progress file that
    /// exists but does not parse is moved to `<path>.corrupt-<timestamp>`
    /// instead of being overwritten.
    pub fn update<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut ProgressState) -> Result<T>,
    {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("progress path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(sidecar_path(path, "lock"))?;
        lock.lock_exclusive()?;

        let result = Self::load_for_update(path).and_then(|mut state| {
            let out = f(&mut state)?;
            state.save(path)?;
            Ok(out)
        });

        lock.unlock()?;
        result
    }

    /// Like `load`, but keeps an unparseable file instead of discarding it
    fn load_for_update(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = read_locked(path)?;
        match serde_json::from_str::<ProgressState>(&contents) {
            Ok(state) => Ok(state),
            Err(e) => {
                let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
                let aside = sidecar_path(path, &format!("corrupt-{}", stamp));
                std::fs::rename(path, &aside)?;
                tracing::warn!(
                    "Progress file {:?} is corrupt ({}); moved to {:?} and starting fresh",
                    path,
                    e,
                    aside
                );
                Ok(Self::default())
            }
        }
    }
}

/// `progress.json` + `lock` -> `progress.json.lock`
fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Read a whole file while holding a shared lock
fn read_locked(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    file.lock_shared()?;
    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read.map(|_| contents)
}
