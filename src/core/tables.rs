//! Empty table cells filled from their column header.
//!
//! For a table whose first row is a header, a blank body cell under a
//! meaningful header becomes `{{<header><row>}}`. No label lookup is
//! involved.

use serde::{Deserialize, Serialize};

use crate::domain::Table;

/// Header texts that do not name a field
const PLACEHOLDER_HEADERS: [&str; 3] = ["-", "*", "#"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Fill blank body cells from the header row
    #[serde(default = "default_fill_empty_cells")]
    pub fill_empty_cells: bool,
}

fn default_fill_empty_cells() -> bool {
    true
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            fill_empty_cells: default_fill_empty_cells(),
        }
    }
}

/// A blank cell and the label it should receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyCellTarget {
    pub row: usize,
    pub column: usize,
    pub header: String,
    pub label: String,
}

fn is_meaningful(header: &str) -> bool {
    !header.is_empty() && !PLACEHOLDER_HEADERS.contains(&header)
}

/// Header row texts, trimmed
pub fn headers(table: &Table) -> Vec<String> {
    table
        .rows
        .first()
        .map(|row| row.cells.iter().map(|c| c.text().trim().to_string()).collect())
        .unwrap_or_default()
}

/// Blank body cells that can be labelled from their header
pub fn empty_cell_targets(table: &Table) -> Vec<EmptyCellTarget> {
    if table.rows.len() < 2 {
        return Vec::new();
    }
    let headers = headers(table);
    if headers.iter().all(String::is_empty) {
        return Vec::new();
    }

    let mut targets = Vec::new();
    for (row_idx, row) in table.rows.iter().enumerate().skip(1) {
        for (col_idx, cell) in row.cells.iter().enumerate() {
            if cell.merged || !cell.is_blank() {
                continue;
            }
            let Some(header) = headers.get(col_idx).filter(|h| is_meaningful(h)) else {
                continue;
            };
            targets.push(EmptyCellTarget {
                row: row_idx,
                column: col_idx,
                header: header.clone(),
                label: format!("{}{}", header, row_idx),
            });
        }
    }

    targets
}
