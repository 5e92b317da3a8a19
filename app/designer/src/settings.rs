//! FILENAME: app/designer/src/settings.rs
// PURPOSE: Designer settings loaded from a JSON file with environment overrides.
// CONTEXT: Every field has a default so an empty or partial file is valid.
// Environment variables named `REPORT_DESIGNER_<FIELD>` win over the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_PREFIX: &str = "REPORT_DESIGNER_";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error reading settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignerSettings {
    /// Base URL of the remote panel API; empty disables remote save/load.
    pub api_base_url: String,
    pub bus_domain_code: String,
    pub username: String,
    pub password: String,
    /// Panel and button invoked to save a report node.
    pub save_panel_code: String,
    pub save_button_name: String,
    /// Panel holding detail-report configurations; empty means the save panel.
    pub detail_panel_code: String,
    /// Panel describing source tables (field names and labels).
    pub table_panel_code: String,
    /// Key-value storage file; `None` keeps storage in memory.
    pub storage_path: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub export_base_name: String,
    pub log_path: Option<PathBuf>,
    pub initial_rows: u32,
    pub initial_cols: u32,
    pub report_title: String,
    pub node_type: String,
}

impl Default for DesignerSettings {
    fn default() -> Self {
        DesignerSettings {
            api_base_url: String::new(),
            bus_domain_code: String::new(),
            username: String::new(),
            password: String::new(),
            save_panel_code: "IML_00001".to_string(),
            save_button_name: "保存".to_string(),
            detail_panel_code: String::new(),
            table_panel_code: "IML_00003".to_string(),
            storage_path: None,
            export_dir: PathBuf::from("exports"),
            export_base_name: "table_config".to_string(),
            log_path: None,
            initial_rows: 20,
            initial_cols: 20,
            report_title: String::new(),
            node_type: "指标报表".to_string(),
        }
    }
}

impl DesignerSettings {
    pub fn remote_enabled(&self) -> bool {
        !self.api_base_url.trim().is_empty()
    }

    /// Applies overrides from `lookup`, called with full variable names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let parse_u32 = |name: &str, value: String| {
            value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or(SettingsError::InvalidValue {
                    key: format!("{}{}", ENV_PREFIX, name),
                    value,
                })
        };

        if let Some(v) = var("API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = var("BUS_DOMAIN_CODE") {
            self.bus_domain_code = v;
        }
        if let Some(v) = var("USERNAME") {
            self.username = v;
        }
        if let Some(v) = var("PASSWORD") {
            self.password = v;
        }
        if let Some(v) = var("SAVE_PANEL_CODE") {
            self.save_panel_code = v;
        }
        if let Some(v) = var("DETAIL_PANEL_CODE") {
            self.detail_panel_code = v;
        }
        if let Some(v) = var("TABLE_PANEL_CODE") {
            self.table_panel_code = v;
        }
        if let Some(v) = var("STORAGE_PATH") {
            self.storage_path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = var("EXPORT_DIR") {
            self.export_dir = PathBuf::from(v);
        }
        if let Some(v) = var("LOG_PATH") {
            self.log_path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = var("ROWS") {
            self.initial_rows = parse_u32("ROWS", v)?;
        }
        if let Some(v) = var("COLS") {
            self.initial_cols = parse_u32("COLS", v)?;
        }
        if let Some(v) = var("TITLE") {
            self.report_title = v;
        }
        Ok(())
    }
}

/// Loads settings from `path` (when given and present), then applies
/// `REPORT_DESIGNER_*` environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<DesignerSettings, SettingsError> {
    let mut settings = match path {
        Some(p) if p.exists() => {
            let text = fs::read_to_string(p)?;
            if text.trim().is_empty() {
                DesignerSettings::default()
            } else {
                serde_json::from_str(&text)?
            }
        }
        _ => DesignerSettings::default(),
    };
    settings.apply_overrides(|name| std::env::var(name).ok())?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: DesignerSettings =
            serde_json::from_str(r#"{ "initialRows": 5, "apiBaseUrl": "https://panel.local" }"#).unwrap();
        assert_eq!(settings.initial_rows, 5);
        assert_eq!(settings.initial_cols, 20);
        assert_eq!(settings.save_panel_code, "IML_00001");
        assert!(settings.remote_enabled());
        assert!(!DesignerSettings::default().remote_enabled());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<String, String> = [
            ("REPORT_DESIGNER_ROWS", "8"),
            ("REPORT_DESIGNER_TITLE", "Cash flow"),
            ("REPORT_DESIGNER_STORAGE_PATH", "/tmp/designer.json"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut settings = DesignerSettings::default();
        settings.apply_overrides(|name| env.get(name).cloned()).unwrap();
        assert_eq!(settings.initial_rows, 8);
        assert_eq!(settings.report_title, "Cash flow");
        assert_eq!(settings.storage_path, Some(PathBuf::from("/tmp/designer.json")));
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut settings = DesignerSettings::default();
        let err = settings
            .apply_overrides(|name| (name == "REPORT_DESIGNER_COLS").then(|| "zero".to_string()))
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(settings.export_base_name, "table_config");
    }
}
