//! FILENAME: core/persistence/src/config_store.rs
//! PURPOSE: Per-cell query configuration records and their durable storage.
//! CONTEXT: Records are created lazily the first time a cell is inspected,
//! patched from the side panel and written to storage on every blur (one key
//! per cell, no batching). Memory is authoritative: storage failures are
//! returned to the caller for logging and never roll back the in-memory
//! record.

use crate::error::PersistenceError;
use crate::storage::{
    config_key, is_config_related, parse_config_key, KeyValueStore, CELL_CONFIGURATIONS_KEY,
    CELL_CONFIG_PREFIX,
};
use report_engine::{CellRef, CellType};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// PROFILE
// ============================================================================

/// Shape of freshly created records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigProfile {
    /// Defaults include the data date, currency and organization dimensions.
    #[default]
    Full,
    /// Set after a full reset; those extra dimensions are left out.
    Cleared,
}

// ============================================================================
// RECORD
// ============================================================================

pub const DEFAULT_PRECISION: &str = "2";
pub const DEFAULT_CALC_RULE: &str = "today";
pub const DEFAULT_TIME_UNIT: &str = "none";
pub const DEFAULT_VALUE_TYPE: &str = "point";
pub const DEFAULT_CURRENCY: &str = "CNY";
pub const DEFAULT_ORGANIZATION: &str = "head";

/// Accepts strings, numbers and booleans; imported documents are not always
/// consistent about `precision: "2"` vs `precision: 2`.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellConfig {
    #[serde(rename = "type", default)]
    pub cell_type: CellType,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub precision: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub calc_rule: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub time_unit: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value_type: String,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub currency: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub organization: Option<String>,
    /// Keys this version does not know about, kept as imported.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CellConfig {
    /// Record created on first touch of a cell. Indicator cells take their
    /// name as source.
    pub fn default_for(cell_type: CellType, name: Option<&str>, profile: ConfigProfile) -> Self {
        let source = match (&cell_type, name) {
            (CellType::Indicator, Some(name)) => name.to_string(),
            _ => String::new(),
        };
        let full = profile == ConfigProfile::Full;
        CellConfig {
            cell_type,
            name: None,
            source,
            unit: String::new(),
            precision: DEFAULT_PRECISION.to_string(),
            calc_rule: DEFAULT_CALC_RULE.to_string(),
            time_unit: DEFAULT_TIME_UNIT.to_string(),
            value_type: DEFAULT_VALUE_TYPE.to_string(),
            data_date: full.then(String::new),
            currency: full.then(|| DEFAULT_CURRENCY.to_string()),
            organization: full.then(|| DEFAULT_ORGANIZATION.to_string()),
            extra: BTreeMap::new(),
        }
    }

    /// Merges the set fields of `patch` into this record. Only indicator
    /// cells keep a source.
    pub fn apply_patch(&mut self, patch: &CellConfigPatch) {
        if let Some(t) = &patch.cell_type {
            self.cell_type = t.clone();
        }
        if let Some(name) = &patch.name {
            self.name = if name.is_empty() { None } else { Some(name.clone()) };
        }
        let assign = |target: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                *target = v.clone();
            }
        };
        assign(&mut self.source, &patch.source);
        assign(&mut self.unit, &patch.unit);
        assign(&mut self.precision, &patch.precision);
        assign(&mut self.calc_rule, &patch.calc_rule);
        assign(&mut self.time_unit, &patch.time_unit);
        assign(&mut self.value_type, &patch.value_type);
        if patch.data_date.is_some() {
            self.data_date = patch.data_date.clone();
        }
        if patch.currency.is_some() {
            self.currency = patch.currency.clone();
        }
        if patch.organization.is_some() {
            self.organization = patch.organization.clone();
        }

        if self.cell_type != CellType::Indicator {
            self.source.clear();
        }
    }
}

/// Partial update from the side panel; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellConfigPatch {
    #[serde(rename = "type")]
    pub cell_type: Option<CellType>,
    pub name: Option<String>,
    pub source: Option<String>,
    pub unit: Option<String>,
    pub precision: Option<String>,
    pub calc_rule: Option<String>,
    pub time_unit: Option<String>,
    pub value_type: Option<String>,
    pub data_date: Option<String>,
    pub currency: Option<String>,
    pub organization: Option<String>,
}

// ============================================================================
// STORE
// ============================================================================

pub struct CellConfigStore {
    configs: BTreeMap<CellRef, CellConfig>,
    storage: Box<dyn KeyValueStore>,
    profile: ConfigProfile,
}

impl CellConfigStore {
    pub fn new(storage: Box<dyn KeyValueStore>, profile: ConfigProfile) -> Self {
        CellConfigStore {
            configs: BTreeMap::new(),
            storage,
            profile,
        }
    }

    pub fn profile(&self) -> ConfigProfile {
        self.profile
    }

    pub fn set_profile(&mut self, profile: ConfigProfile) {
        self.profile = profile;
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn KeyValueStore {
        self.storage.as_mut()
    }

    pub fn get(&self, cell_ref: &CellRef) -> Option<&CellConfig> {
        self.configs.get(cell_ref)
    }

    pub fn records(&self) -> &BTreeMap<CellRef, CellConfig> {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    fn read_stored(&self, cell_ref: &CellRef) -> Option<CellConfig> {
        let raw = match self.storage.get_item(&config_key(cell_ref)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("reading stored config for {} failed: {}", cell_ref, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("stored config for {} is unreadable: {}", cell_ref, e);
                None
            }
        }
    }

    /// Returns the record for a cell, creating it on first touch. A record
    /// already in durable storage wins over the default.
    pub fn get_or_create(
        &mut self,
        cell_ref: &CellRef,
        cell_type: CellType,
        name: Option<&str>,
    ) -> &CellConfig {
        if !self.configs.contains_key(cell_ref) {
            let config = self
                .read_stored(cell_ref)
                .unwrap_or_else(|| CellConfig::default_for(cell_type, name, self.profile));
            self.configs.insert(cell_ref.clone(), config);
        }
        &self.configs[cell_ref]
    }

    /// Merges a patch into the record, creating a default text record first
    /// if the cell has none.
    pub fn set(&mut self, cell_ref: &CellRef, patch: &CellConfigPatch) -> &CellConfig {
        let initial_type = patch.cell_type.clone().unwrap_or_default();
        self.get_or_create(cell_ref, initial_type, None);
        let config = self
            .configs
            .entry(cell_ref.clone())
            .or_insert_with(|| CellConfig::default_for(CellType::Text, None, ConfigProfile::Full));
        config.apply_patch(patch);
        config
    }

    /// Drops the type, name and source binding of a cell, in memory and in
    /// storage. Returns false when the cell had no record.
    pub fn clear(&mut self, cell_ref: &CellRef) -> Result<bool, PersistenceError> {
        let Some(config) = self.configs.get_mut(cell_ref) else {
            return Ok(false);
        };
        config.cell_type = CellType::Text;
        config.name = None;
        config.source.clear();
        self.persist(cell_ref)?;
        Ok(true)
    }

    /// Writes a single record under its `cellConfig_` key.
    pub fn persist(&mut self, cell_ref: &CellRef) -> Result<(), PersistenceError> {
        let Some(config) = self.configs.get(cell_ref) else {
            return Ok(());
        };
        let json = serde_json::to_string(config)?;
        self.storage.set_item(&config_key(cell_ref), &json)
    }

    /// Writes every record under the aggregate key.
    pub fn persist_aggregate(&mut self) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(&self.to_json_map())?;
        self.storage.set_item(CELL_CONFIGURATIONS_KEY, &json)
    }

    /// Rehydrates memory from storage: the aggregate record first, then the
    /// per-cell records, which are written more often and win. Unreadable
    /// entries are logged and skipped. Returns the number of records held.
    pub fn load_all(&mut self) -> usize {
        match self.storage.get_item(CELL_CONFIGURATIONS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(map) => {
                    for (key, value) in map {
                        self.insert_value(&key, value);
                    }
                }
                Err(e) => log::warn!("aggregate config record is unreadable: {}", e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("reading aggregate config record failed: {}", e),
        }

        let keys: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(CELL_CONFIG_PREFIX))
            .collect();
        for key in keys {
            let Some(cell_ref) = parse_config_key(&key) else {
                log::warn!("ignoring config key with bad cell reference: {}", key);
                continue;
            };
            if let Some(config) = self.read_stored(&cell_ref) {
                self.configs.insert(cell_ref, config);
            }
        }

        log::debug!("loaded {} cell configurations", self.configs.len());
        self.configs.len()
    }

    fn insert_value(&mut self, key: &str, value: Value) -> Option<CellRef> {
        let Some(cell_ref) = CellRef::parse(key) else {
            log::warn!("ignoring config for bad cell reference: {}", key);
            return None;
        };
        if !value.is_object() {
            log::warn!("ignoring non-object config for {}", key);
            return None;
        }
        match serde_json::from_value::<CellConfig>(value) {
            Ok(config) => {
                self.configs.insert(cell_ref.clone(), config);
                Some(cell_ref)
            }
            Err(e) => {
                log::warn!("ignoring unreadable config for {}: {}", key, e);
                None
            }
        }
    }

    /// Imports records from a snapshot: each one replaces the in-memory
    /// record and is written under its own key, then the aggregate is
    /// rewritten. Storage failures are logged; the import still counts.
    pub fn import_all(&mut self, records: &Map<String, Value>) -> usize {
        let mut imported = 0;
        for (key, value) in records {
            let Some(cell_ref) = self.insert_value(key, value.clone()) else {
                continue;
            };
            imported += 1;
            if let Err(e) = self.persist(&cell_ref) {
                log::error!("saving config for {} failed: {}", cell_ref, e);
            }
        }
        if let Err(e) = self.persist_aggregate() {
            log::warn!("saving aggregate config record failed: {}", e);
        }
        imported
    }

    /// Removes every configuration-related storage key, empties memory and
    /// switches new records to the `Cleared` profile. Returns the number of
    /// keys removed.
    pub fn clear_all(&mut self) -> usize {
        let doomed: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|k| is_config_related(k))
            .collect();
        let mut removed = 0;
        for key in doomed {
            match self.storage.remove_item(&key) {
                Ok(()) => removed += 1,
                Err(e) => log::error!("removing storage key {} failed: {}", key, e),
            }
        }
        self.configs.clear();
        self.profile = ConfigProfile::Cleared;
        log::info!("cleared all cell configurations ({} storage keys)", removed);
        removed
    }

    /// Records as a JSON object keyed by CellRef, the snapshot shape.
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.configs
            .iter()
            .filter_map(|(cell_ref, config)| {
                serde_json::to_value(config)
                    .ok()
                    .filter(|v| v.as_object().map(|o| !o.is_empty()).unwrap_or(false))
                    .map(|v| (cell_ref.to_string(), v))
            })
            .collect()
    }
}
