//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for report designer integration tests.

#![allow(dead_code)]

use designer_lib::{create_app_state, logging, AppState, DesignerSettings};
use report_engine::{CellRef, DesignCell};
use report_persistence::{CellConfig, KeyValueStore, MemoryStore};

/// Test harness for creating and managing test state.
pub struct TestHarness {
    pub state: AppState,
}

impl TestHarness {
    /// Create a new test harness with a default 20x20 table and in-memory storage.
    pub fn new() -> Self {
        Self::with_settings(DesignerSettings::default())
    }

    pub fn with_size(rows: u32, cols: u32) -> Self {
        Self::with_settings(DesignerSettings {
            initial_rows: rows,
            initial_cols: cols,
            ..DesignerSettings::default()
        })
    }

    pub fn with_settings(settings: DesignerSettings) -> Self {
        Self::with_storage(settings, Box::new(MemoryStore::new()))
    }

    pub fn with_storage(settings: DesignerSettings, storage: Box<dyn KeyValueStore>) -> Self {
        logging::set_console_echo(false);
        TestHarness {
            state: create_app_state(settings, storage),
        }
    }

    /// Create a harness with a small income report:
    ///
    /// ```text
    ///      A          B        C
    /// 1    Income statement
    /// 2    Item       Q1       Q2
    /// 3    Revenue    {amount} 
    /// ```
    pub fn with_sample_data() -> Self {
        let harness = Self::with_size(5, 4);
        harness.populate_sample_data();
        harness
    }

    fn populate_sample_data(&self) {
        let mut grid = self.state.grid.lock().unwrap();
        grid.set_content(0, 0, "Income statement");
        grid.set_content(1, 0, "Item");
        grid.set_content(1, 1, "Q1");
        grid.set_content(1, 2, "Q2");
        grid.set_content(2, 0, "Revenue");
    }

    // ========================================================================
    // HELPER METHODS
    // ========================================================================

    pub fn set_text(&self, row: u32, col: u32, text: &str) {
        let mut grid = self.state.grid.lock().unwrap();
        assert!(grid.set_content(row, col, text), "({}, {}) is outside the table", row, col);
    }

    pub fn cell(&self, row: u32, col: u32) -> DesignCell {
        let grid = self.state.grid.lock().unwrap();
        grid.cell(row, col).cloned().expect("cell inside the table")
    }

    pub fn select_range(&self, start: (u32, u32), end: (u32, u32)) {
        let mut selection = self.state.selection.lock().unwrap();
        selection.select_range(start, end);
    }

    pub fn config(&self, cell_ref: &str) -> Option<CellConfig> {
        let configs = self.state.configs.lock().unwrap();
        configs.get(&CellRef::parse(cell_ref).unwrap()).cloned()
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        let configs = self.state.configs.lock().unwrap();
        configs.storage().get_item(key).unwrap()
    }

    pub fn merge_count(&self) -> usize {
        self.state.merges.lock().unwrap().regions().len()
    }
}

/// Assert the text of a cell.
pub fn assert_cell_text(harness: &TestHarness, row: u32, col: u32, expected: &str) {
    let cell = harness.cell(row, col);
    assert_eq!(cell.content, expected, "content of ({}, {})", row, col);
}
