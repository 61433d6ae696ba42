use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::Snapshot;

/// Well-known key of the single snapshot slot.
pub const SNAPSHOT_KEY: &str = "att_cache_v2";
const SNAPSHOT_VERSION: u32 = 2;
pub const CACHE_DIR: &str = "raid_attendance";

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    version: u32,
    snapshot: Snapshot,
}

#[derive(Serialize)]
struct SnapshotFileRef<'a> {
    version: u32,
    snapshot: &'a Snapshot,
}

/// Single-slot durable store for the last successful dataset.
///
/// Every failure is absorbed: a missing, unreadable, corrupt, or
/// version-mismatched file reads as "no snapshot", and failed writes are
/// logged and dropped.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: Option<PathBuf>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let path = dir.into().join(format!("{SNAPSHOT_KEY}.json"));
        Self { path: Some(path) }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Option<Snapshot> {
        let path = self.path.as_ref()?;
        match read_snapshot(path) {
            Ok(Some(mut snapshot)) => {
                snapshot.dataset.sanitize();
                Some(snapshot)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable snapshot: {err:#}");
                None
            }
        }
    }

    pub fn save(&self, snapshot: &Snapshot) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if let Err(err) = write_snapshot(path, snapshot) {
            tracing::warn!(path = %path.display(), "snapshot write failed: {err:#}");
        }
    }

    pub fn clear(&self) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), "snapshot clear failed: {err}");
            }
        }
    }
}

fn read_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).context("read snapshot"),
    };
    let file: SnapshotFile = serde_json::from_str(&raw).context("decode snapshot")?;
    if file.version != SNAPSHOT_VERSION {
        tracing::info!(found = file.version, "discarding snapshot from another version");
        return Ok(None);
    }
    Ok(Some(file.snapshot))
}

fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("create snapshot dir")?;
    }
    let file = SnapshotFileRef {
        version: SNAPSHOT_VERSION,
        snapshot,
    };
    let json = serde_json::to_string(&file).context("serialize snapshot")?;
    // Readers only ever see the old file or the complete new one.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).context("write snapshot")?;
    fs::rename(&tmp, path).context("swap snapshot")?;
    Ok(())
}

pub fn default_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}
