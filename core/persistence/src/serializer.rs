//! FILENAME: core/persistence/src/serializer.rs
//! PURPOSE: Builds a TableSnapshot from the live design state.
//! CONTEXT: Only configured cells are written (see `DesignCell::is_configured`);
//! every other slot is `null` so a record's position in its row always equals
//! its column. Rows without configured cells are left out, so consumers must
//! place records by their explicit `rowIndex`/`cellIndex`.

use crate::config_store::CellConfigStore;
use crate::detail::{collect_detail_config, DataSourceSelection, FieldCatalog, FilterField};
use crate::snapshot::{CellRecord, SnapshotMetadata, TableSnapshot};
use report_engine::{CellCoord, CellType, DesignCell, Grid, MergeTracker};
use std::collections::BTreeMap;

pub const DEFAULT_TITLE: &str = "Untitled table";

#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions<'a> {
    pub title: &'a str,
    pub node_type: Option<&'a str>,
    /// Set for detail reports; adds `detailReportConfig`.
    pub detail_source: Option<&'a DataSourceSelection>,
    pub catalog: Option<&'a FieldCatalog>,
    pub filter_fields: Option<&'a [FilterField]>,
}

/// Snapshot record of one cell. The caller decides whether the cell is
/// configured.
pub fn cell_record((row, col): CellCoord, cell: &DesignCell) -> CellRecord {
    let style = (!cell.style.is_empty()).then(|| cell.style.to_css_map());

    let data = match (&cell.cell_type, &cell.binding) {
        (CellType::Field, Some(binding)) => {
            let mut data = BTreeMap::new();
            data.insert("table".to_string(), binding.table.clone());
            data.insert("field".to_string(), binding.field.clone());
            let display = if binding.display_name.is_empty() {
                binding.field.clone()
            } else {
                binding.display_name.clone()
            };
            data.insert("displayName".to_string(), display);
            Some(data)
        }
        _ => (!cell.data.is_empty()).then(|| cell.data.clone()),
    };

    CellRecord {
        value: cell.content.trim().to_string(),
        cell_type: cell.cell_type.as_str().to_string(),
        row_index: row,
        cell_index: col,
        colspan: (cell.col_span > 1).then_some(cell.col_span),
        rowspan: (cell.row_span > 1).then_some(cell.row_span),
        style,
        data,
    }
}

/// Rows of `tableData`: configured cells at their column, `null` elsewhere.
pub fn collect_table_data(grid: &Grid) -> Vec<Vec<Option<CellRecord>>> {
    grid.iter_rows()
        .enumerate()
        .filter_map(|(r, cells)| {
            let row: Vec<Option<CellRecord>> = cells
                .iter()
                .enumerate()
                .map(|(c, cell)| {
                    cell.is_configured()
                        .then(|| cell_record((r as u32, c as u32), cell))
                })
                .collect();
            row.iter().any(Option::is_some).then_some(row)
        })
        .collect()
}

pub fn serialize_table(
    grid: &Grid,
    merges: &MergeTracker,
    configs: &CellConfigStore,
    options: &SerializeOptions<'_>,
) -> TableSnapshot {
    let title = if options.title.trim().is_empty() {
        DEFAULT_TITLE
    } else {
        options.title
    };

    let filter_fields = options.filter_fields.map(<[FilterField]>::to_vec);
    let detail_report_config = options.detail_source.map(|source| {
        let empty = FieldCatalog::default();
        collect_detail_config(
            grid,
            source,
            options.catalog.unwrap_or(&empty),
            filter_fields.as_deref().unwrap_or(&[]),
        )
    });

    let table_data = collect_table_data(grid);
    log::debug!(
        "serialized table: {} rows with configured cells, {} merge records, {} configs",
        table_data.len(),
        merges.len(),
        configs.len()
    );

    TableSnapshot {
        metadata: SnapshotMetadata::now(title, options.node_type.map(str::to_string)),
        detail_report_config,
        filter_fields,
        cell_configurations: configs.to_json_map(),
        cell_merge_info: merges.records().clone(),
        table_data,
    }
}
