//! FILENAME: core/persistence/src/storage.rs
//! PURPOSE: Durable key-value storage for cell configurations and viewer data.
//! CONTEXT: Values are JSON strings stored under flat string keys. Writes are
//! per key with no transaction across keys; a crash between two writes can
//! leave the per-cell records and the aggregate record out of step.

use crate::error::PersistenceError;
use report_engine::CellRef;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

// ============================================================================
// KEYS
// ============================================================================

/// Prefix of the per-cell configuration records.
pub const CELL_CONFIG_PREFIX: &str = "cellConfig_";

/// Aggregate record holding every cell configuration.
pub const CELL_CONFIGURATIONS_KEY: &str = "cellConfigurations";

/// Payload handed to the read-only viewer.
pub const LAST_VIEWED_KEY: &str = "lastViewedTableData";

/// Key fragments whose entries are removed by a full configuration reset.
const CONFIG_KEY_FRAGMENTS: [&str; 5] = ["cell", "config", "table", "grid", "sheet"];

pub fn config_key(cell_ref: &CellRef) -> String {
    format!("{}{}", CELL_CONFIG_PREFIX, cell_ref)
}

/// CellRef encoded in a per-cell configuration key, if it is one.
pub fn parse_config_key(key: &str) -> Option<CellRef> {
    key.strip_prefix(CELL_CONFIG_PREFIX).and_then(CellRef::parse)
}

/// Whether a key belongs to the designer's configuration state.
pub fn is_config_related(key: &str) -> bool {
    CONFIG_KEY_FRAGMENTS.iter().any(|frag| key.contains(frag))
}

// ============================================================================
// TRAIT
// ============================================================================

pub trait KeyValueStore: Send {
    fn get_item(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;

    fn remove_item(&mut self, key: &str) -> Result<(), PersistenceError>;

    /// All keys currently stored, sorted.
    fn keys(&self) -> Vec<String>;
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-process store with an optional byte quota, mirroring browser storage
/// limits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store refusing writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        MemoryStore {
            entries: BTreeMap::new(),
            quota: Some(bytes),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if let Some(quota) = self.quota {
            let current = self.entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed = self.used_bytes() - current + key.len() + value.len();
            if needed > quota {
                return Err(PersistenceError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// Store backed by one JSON object file; the whole file is rewritten
/// atomically on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str::<BTreeMap<String, String>>(&text).map_err(|e| {
                    PersistenceError::InvalidFormat(format!("{}: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };
        log::debug!("opened file store {} with {} keys", path.display(), entries.len());
        Ok(FileStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(&self.entries)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| PersistenceError::Io(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            // Keep memory in step with what is on disk.
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), PersistenceError> {
        let Some(previous) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush() {
            self.entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
