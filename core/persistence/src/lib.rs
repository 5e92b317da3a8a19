//! FILENAME: core/persistence/src/lib.rs
//! Report Designer Persistence Module
//!
//! Handles the table snapshot format (serialize / apply), the per-cell
//! configuration store, durable key-value storage, export files and the
//! viewer payload.

mod error;

pub mod applier;
pub mod config_store;
pub mod detail;
pub mod export;
pub mod serializer;
pub mod snapshot;
pub mod storage;
pub mod viewer;

pub use applier::{apply_snapshot, ApplyReport};
pub use config_store::{CellConfig, CellConfigPatch, CellConfigStore, ConfigProfile};
pub use detail::{collect_detail_config, DataSourceSelection, DetailReportConfig, FieldCatalog, FieldInfo, FilterField};
pub use error::{ApplyError, PersistenceError};
pub use export::{export_file_name, export_snapshot, import_document};
pub use serializer::{serialize_table, SerializeOptions};
pub use snapshot::{CellRecord, SnapshotMetadata, TableSnapshot};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use viewer::{load_last_viewed, save_last_viewed, ViewerPayload};
