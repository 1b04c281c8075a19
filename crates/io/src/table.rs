//! Sparse rows x columns of cells, the shape a persisted sheet has.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tpmgrid_engine::CellValue;

/// Where measurement rows begin in a persisted sheet. Rows above belong to
/// the sheet header and are never touched by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableLayout {
    /// Workbook files: data from spreadsheet row 5.
    #[default]
    Workbook,
    /// Sheets already loaded into the application: data from row 4.
    LoadedSheet,
    /// Data from this 0-indexed row.
    Custom(usize),
}

impl TableLayout {
    /// 0-indexed first data row.
    pub fn data_start_row(&self) -> usize {
        match self {
            TableLayout::Workbook => 4,
            TableLayout::LoadedSheet => 3,
            TableLayout::Custom(row) => *row,
        }
    }

    /// Row holding the column labels, if the layout leaves room for one.
    pub fn label_row(&self) -> Option<usize> {
        self.data_start_row().checked_sub(1)
    }
}

impl std::str::FromStr for TableLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workbook" => Ok(TableLayout::Workbook),
            "loaded" | "loaded_sheet" | "loaded-sheet" => Ok(TableLayout::LoadedSheet),
            other => other
                .parse::<usize>()
                .map(TableLayout::Custom)
                .map_err(|_| format!("unknown layout '{s}' (expected workbook, loaded_sheet or a row number)")),
        }
    }
}

/// Display kind of a cell that held an Excel serial date in its workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Date,
    Time,
    DateTime,
}

impl DateKind {
    /// Classify a serial number by its whole-day and time-of-day parts.
    pub fn for_serial(serial: f64) -> Self {
        let has_date = serial.floor() > 0.0;
        let has_time = serial.fract().abs() > 0.0001;
        match (has_date, has_time) {
            (true, true) => DateKind::DateTime,
            (false, true) => DateKind::Time,
            _ => DateKind::Date,
        }
    }

    /// Excel number format used when writing the cell back.
    pub fn num_format(&self) -> &'static str {
        match self {
            DateKind::Date => "m/d/yyyy",
            DateKind::Time => "h:mm:ss",
            DateKind::DateTime => "m/d/yyyy h:mm:ss",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    cells: HashMap<(usize, usize), CellValue>,
    /// Extent: one past the last row / column ever set or declared.
    pub rows: usize,
    pub cols: usize,
    /// Cells to render with the TPM highlight.
    marked: BTreeSet<(usize, usize)>,
    /// Cells holding serial dates, so they are written back as dates.
    dates: BTreeMap<(usize, usize), DateKind>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(rows: usize, cols: usize) -> Self {
        Self { rows, cols, ..Self::default() }
    }

    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.cells.get(&(row, col)).unwrap_or(EMPTY)
    }

    /// Set a cell. Empty values clear it; the extent still grows.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        self.rows = self.rows.max(row + 1);
        self.cols = self.cols.max(col + 1);
        self.dates.remove(&(row, col));
        if value.is_empty() {
            self.cells.remove(&(row, col));
            self.marked.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    /// Set a serial date number, remembering how it is displayed.
    pub fn set_date(&mut self, row: usize, col: usize, serial: f64, kind: DateKind) {
        self.set(row, col, CellValue::Number(serial));
        self.dates.insert((row, col), kind);
    }

    pub fn date_kind(&self, row: usize, col: usize) -> Option<DateKind> {
        self.dates.get(&(row, col)).copied()
    }

    pub fn mark(&mut self, row: usize, col: usize) {
        self.marked.insert((row, col));
    }

    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        self.marked.contains(&(row, col))
    }

    pub fn marked(&self) -> impl Iterator<Item = &(usize, usize)> {
        self.marked.iter()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Non-empty cells in row-major order.
    pub fn cells_sorted(&self) -> Vec<((usize, usize), &CellValue)> {
        let mut cells: Vec<_> = self.cells.iter().map(|(k, v)| (*k, v)).collect();
        cells.sort_by_key(|(k, _)| *k);
        cells
    }

    /// Drop every cell at or below `from_row`, keeping the header above.
    pub fn clear_from_row(&mut self, from_row: usize) {
        self.cells.retain(|(row, _), _| *row < from_row);
        self.marked.retain(|(row, _)| *row < from_row);
        self.dates.retain(|(row, _), _| *row < from_row);
    }

    /// Replace everything at or below `from_row` with `other`'s cells there.
    pub fn replace_from_row(&mut self, other: &Table, from_row: usize) {
        self.clear_from_row(from_row);
        for ((row, col), value) in other.cells.iter() {
            if *row >= from_row {
                self.set(*row, *col, value.clone());
            }
        }
        for (row, col) in other.marked.iter() {
            if *row >= from_row {
                self.mark(*row, *col);
            }
        }
        for ((row, col), kind) in other.dates.iter() {
            if *row >= from_row {
                self.dates.insert((*row, *col), *kind);
            }
        }
        self.cols = self.cols.max(other.cols);
    }
}
