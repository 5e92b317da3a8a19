//! FILENAME: tests/test_merge_commands.rs
//! Integration tests for merging and unmerging the selection.

mod common;

use common::{assert_cell_text, TestHarness};
use designer_lib::cell_commands::select_cell;
use designer_lib::merge_commands::{get_merge_info, get_merged_regions, merge_selection, unmerge_selection};
use report_engine::MergedRegion;

// ============================================================================
// MERGE
// ============================================================================

#[test]
fn test_merge_title_row() {
    let harness = TestHarness::with_sample_data();
    harness.select_range((0, 0), (0, 2));

    let result = merge_selection(&harness.state).unwrap();

    assert!(result.success);
    assert_eq!(
        result.merged_regions,
        vec![MergedRegion { start_row: 0, start_col: 0, end_row: 0, end_col: 2 }]
    );
    assert_eq!(result.updated_cells.len(), 3);
    assert_eq!(result.updated_cells[0].col_span, 3);
    assert!(result.updated_cells[1..].iter().all(|c| c.hidden));

    assert_cell_text(&harness, 0, 0, "Income statement");
    assert!(harness.cell(0, 1).hidden);
    assert!(harness.state.selection.lock().unwrap().is_empty());
}

#[test]
fn test_merge_joins_texts_in_reading_order() {
    let harness = TestHarness::with_sample_data();
    harness.select_range((1, 0), (1, 2));

    merge_selection(&harness.state).unwrap();

    assert_cell_text(&harness, 1, 0, "Item Q1 Q2");
}

#[test]
fn test_merge_needs_two_cells() {
    let harness = TestHarness::with_sample_data();
    select_cell(&harness.state, 0, 0, false).unwrap();

    let err = merge_selection(&harness.state).unwrap_err();

    assert!(err.contains("at least two cells"));
    assert_eq!(harness.merge_count(), 0);
}

#[test]
fn test_merge_rejects_non_rectangular_selection() {
    let harness = TestHarness::with_sample_data();
    select_cell(&harness.state, 0, 0, false).unwrap();
    select_cell(&harness.state, 1, 1, true).unwrap();

    let err = merge_selection(&harness.state).unwrap_err();

    assert!(err.contains("rectangle"));
    assert_eq!(harness.cell(0, 0).col_span, 1);
    assert!(!harness.cell(1, 1).hidden);
}

#[test]
fn test_merge_over_covered_cell_keeps_region() {
    let harness = TestHarness::with_sample_data();
    harness.select_range((0, 0), (0, 2));
    merge_selection(&harness.state).unwrap();

    // B1 is covered by A1:C1
    harness.select_range((0, 1), (1, 1));
    let err = merge_selection(&harness.state).unwrap_err();

    assert!(err.contains("already merged"));
    assert_eq!(harness.merge_count(), 1);
    assert_eq!(harness.cell(0, 0).col_span, 3);
    assert!(harness.cell(0, 1).hidden);
    assert!(!harness.cell(1, 1).hidden);
    assert_cell_text(&harness, 1, 1, "Q1");
}

// ============================================================================
// UNMERGE
// ============================================================================

#[test]
fn test_unmerge_from_covered_cell() {
    let harness = TestHarness::with_sample_data();
    harness.select_range((0, 0), (1, 1));
    merge_selection(&harness.state).unwrap();
    assert_cell_text(&harness, 0, 0, "Income statement Item Q1");

    // Clicking a hidden cell selects the anchor of its region.
    let info = select_cell(&harness.state, 1, 1, false).unwrap();
    assert_eq!(info.cell.cell_ref, "A1");
    assert_eq!(info.merge.map(|r| r.row_span()), Some(2));

    let result = unmerge_selection(&harness.state).unwrap();

    assert!(result.success);
    assert!(result.merged_regions.is_empty());
    assert_eq!(result.updated_cells.len(), 4);
    for cell in &result.updated_cells {
        assert_eq!((cell.row_span, cell.col_span, cell.hidden), (1, 1, false));
    }
    // Merged text is not split back.
    assert_cell_text(&harness, 0, 0, "Income statement Item Q1");
    assert_eq!(harness.merge_count(), 0);
}

#[test]
fn test_unmerge_without_merges() {
    let harness = TestHarness::with_sample_data();
    harness.select_range((2, 0), (3, 1));

    let err = unmerge_selection(&harness.state).unwrap_err();

    assert!(err.contains("no merge information"));
}

#[test]
fn test_unmerge_two_regions_at_once() {
    let harness = TestHarness::with_sample_data();
    harness.select_range((0, 0), (0, 1));
    merge_selection(&harness.state).unwrap();
    harness.select_range((2, 0), (2, 1));
    merge_selection(&harness.state).unwrap();
    assert_eq!(get_merged_regions(&harness.state).unwrap().len(), 2);

    harness.select_range((0, 0), (2, 0));
    let result = unmerge_selection(&harness.state).unwrap();

    assert_eq!(result.updated_cells.len(), 4);
    assert!(get_merged_regions(&harness.state).unwrap().is_empty());
}

#[test]
fn test_get_merge_info() {
    let harness = TestHarness::with_sample_data();
    harness.select_range((1, 1), (2, 2));
    merge_selection(&harness.state).unwrap();

    let expected = MergedRegion { start_row: 1, start_col: 1, end_row: 2, end_col: 2 };
    assert_eq!(get_merge_info(&harness.state, 1, 1).unwrap(), Some(expected));
    assert_eq!(get_merge_info(&harness.state, 2, 2).unwrap(), Some(expected));
    assert_eq!(get_merge_info(&harness.state, 0, 0).unwrap(), None);
}
