//! FILENAME: app/designer/src/events.rs
// PURPOSE: Single entry point for grid interaction events.
// CONTEXT: The UI forwards every click, drag, edit, blur and drop on the
// grid here, addressed by grid coordinates, instead of wiring handlers per
// cell. Events survive table rebuilds because nothing is bound to cells.

use crate::api_types::{CellData, CellInfo, FormatAction, MergeResult};
use crate::{cell_commands, log_debug, merge_commands, AppState};
use report_engine::CellCoord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DesignerEvent {
    /// `toggle` is set when the multi-select modifier is held.
    Click { coord: CellCoord, toggle: bool },
    DragSelect { start: CellCoord, end: CellCoord },
    Input { coord: CellCoord, text: String },
    Blur { coord: CellCoord },
    Drop {
        coord: CellCoord,
        field: String,
        table: String,
        #[serde(default)]
        display_name: Option<String>,
    },
    Format { action: FormatAction },
    Merge,
    Unmerge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "camelCase")]
pub enum EventOutcome {
    Selected(CellInfo),
    Range(Vec<CellCoord>),
    Cells(Vec<CellData>),
    /// Whether a configuration record was written.
    Saved(bool),
    Merge(MergeResult),
}

pub fn dispatch(state: &AppState, event: DesignerEvent) -> Result<EventOutcome, String> {
    log_debug!("EVENT", "{:?}", event);
    match event {
        DesignerEvent::Click { coord, toggle } => {
            cell_commands::select_cell(state, coord.0, coord.1, toggle).map(EventOutcome::Selected)
        }
        DesignerEvent::DragSelect { start, end } => {
            cell_commands::select_range(state, start, end).map(EventOutcome::Range)
        }
        DesignerEvent::Input { coord, text } => {
            cell_commands::set_cell_content(state, coord.0, coord.1, &text)
                .map(|cell| EventOutcome::Cells(vec![cell]))
        }
        DesignerEvent::Blur { coord } => {
            cell_commands::persist_cell_config(state, coord.0, coord.1).map(EventOutcome::Saved)
        }
        DesignerEvent::Drop {
            coord,
            field,
            table,
            display_name,
        } => cell_commands::drop_field(
            state,
            coord.0,
            coord.1,
            &table,
            &field,
            display_name.as_deref(),
        )
        .map(|cell| EventOutcome::Cells(vec![cell])),
        DesignerEvent::Format { action } => {
            cell_commands::apply_formatting(state, action).map(EventOutcome::Cells)
        }
        DesignerEvent::Merge => merge_commands::merge_selection(state).map(EventOutcome::Merge),
        DesignerEvent::Unmerge => merge_commands::unmerge_selection(state).map(EventOutcome::Merge),
    }
}
