//! FILENAME: core/engine/src/coord.rs
//! PURPOSE: Cell addressing for the design grid.
//! CONTEXT: Every component (merge tracker, configuration store, snapshot
//! serializer) keys cells by the same A1-style `CellRef`. Column "A" = 0,
//! "B" = 1, ..., "Z" = 25, "AA" = 26. Row 1 in A1 notation = row 0 internally.
//! Older documents used 1-based `R{row}C{col}` keys counted over data cells
//! (`R1C1` is A1); those are accepted on parse and normalized to A1.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A cell coordinate as (row, col) with 0-based indices.
pub type CellCoord = (u32, u32);

static A1_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]{1,4})([1-9][0-9]*)$").expect("valid A1 pattern"));

static LEGACY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^R([0-9]+)C([0-9]+)$").expect("valid R1C1 pattern"));

/// Converts a column string (e.g., "A", "AA") to a 0-based column index.
/// Returns None for an empty string or any non-alphabetic character.
pub fn col_to_index(col_str: &str) -> Option<u32> {
    if col_str.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result - 1)
}

/// Converts a 0-based column index to a column string.
/// 0 -> "A", 25 -> "Z", 26 -> "AA", 701 -> "ZZ", 702 -> "AAA".
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

/// Converts an A1-style pair to a 0-based (row, col) coordinate.
/// `row_num` is the 1-based row number; returns None for row 0 or a bad column.
pub fn a1_to_coord(col_str: &str, row_num: u32) -> Option<CellCoord> {
    let col = col_to_index(col_str)?;
    let row = row_num.checked_sub(1)?;
    Some((row, col))
}

/// Converts a 0-based (row, col) coordinate to an A1-style reference string.
/// (0, 0) -> "A1", (1, 1) -> "B2", (99, 26) -> "AA100"
pub fn coord_to_a1(coord: CellCoord) -> String {
    let (row, col) = coord;
    format!("{}{}", index_to_col(col), row + 1)
}

/// Stable textual identifier of a grid position.
/// Ordered by position (row, then column), not by text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    text: String,
    coord: CellCoord,
}

impl CellRef {
    pub fn from_coord(coord: CellCoord) -> Self {
        CellRef {
            text: coord_to_a1(coord),
            coord,
        }
    }

    pub fn new(row: u32, col: u32) -> Self {
        Self::from_coord((row, col))
    }

    /// Parses an A1 reference ("B3") or a legacy 1-based "R3C2" reference.
    /// The result is always in canonical A1 form.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(caps) = A1_PATTERN.captures(text) {
            let row_num: u32 = caps[2].parse().ok()?;
            return a1_to_coord(&caps[1], row_num).map(Self::from_coord);
        }
        if let Some(caps) = LEGACY_PATTERN.captures(text) {
            let row: u32 = caps[1].parse().ok()?;
            let col: u32 = caps[2].parse().ok()?;
            return Some(Self::from_coord((row.checked_sub(1)?, col.checked_sub(1)?)));
        }
        None
    }

    pub fn coord(&self) -> CellCoord {
        self.coord
    }

    pub fn row(&self) -> u32 {
        self.coord.0
    }

    pub fn col(&self) -> u32 {
        self.coord.1
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Ord for CellRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.coord.cmp(&other.coord)
    }
}

impl PartialOrd for CellRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<CellCoord> for CellRef {
    fn from(coord: CellCoord) -> Self {
        CellRef::from_coord(coord)
    }
}

impl Serialize for CellRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for CellRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        CellRef::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid cell reference: {}", text)))
    }
}
