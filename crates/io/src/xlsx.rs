// Excel workbook read (xlsx, xls, xlsb, ods) and write (xlsx only)
//
// Reading keeps values only. Writing rebuilds the whole workbook, so saving
// into an existing file keeps every sheet's values but not its styling.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Color, Format, Workbook};
use tpmgrid_engine::{CellValue, SchemaVariant, TestRun};

use crate::codec::{from_table, to_table, CodecOptions};
use crate::error::CodecError;
use crate::table::{DateKind, Table, TableLayout};

/// Fill used for TPM cells.
pub const TPM_HIGHLIGHT: u32 = 0xC6EFCE;

/// One worksheet's values, in workbook order.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTable {
    pub name: String,
    pub table: Table,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    pub sheets_written: usize,
    pub cells_written: usize,
    pub tpm_cells: usize,
    /// True when the test's sheet already existed and only its data region
    /// was replaced.
    pub replaced_existing: bool,
}

fn convert(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text_from_input(s),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        // Serial date number; `read_sheet` records the date kind.
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::text_from_input(s),
        Data::DurationIso(s) => CellValue::text_from_input(s),
    }
}

fn read_sheet<R>(workbook: &mut Sheets<R>, name: &str) -> Result<Table, CodecError>
where
    R: std::io::Read + std::io::Seek,
{
    let range = workbook
        .worksheet_range(name)
        .map_err(|e| CodecError::Xlsx(format!("Failed to read sheet '{}': {}", name, e)))?;

    let mut table = Table::new();
    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let (height, width) = range.get_size();
    if height > 0 && width > 0 {
        table.rows = start_row as usize + height;
        table.cols = start_col as usize + width;
    }

    for (row_idx, row) in range.rows().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let (r, c) = (start_row as usize + row_idx, start_col as usize + col_idx);
            if let Data::DateTime(dt) = cell {
                let serial = dt.as_f64();
                table.set_date(r, c, serial, DateKind::for_serial(serial));
                continue;
            }
            let value = convert(cell);
            if !value.is_empty() {
                table.set(r, c, value);
            }
        }
    }
    Ok(table)
}

/// Read every sheet of a workbook.
pub fn read_workbook(path: &Path) -> Result<Vec<NamedTable>, CodecError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| CodecError::Xlsx(format!("Failed to open Excel file: {}", e)))?;

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let table = read_sheet(&mut workbook, &name)?;
        tables.push(NamedTable { name, table });
    }
    Ok(tables)
}

/// Read one sheet.
pub fn read_table(path: &Path, sheet: &str) -> Result<Table, CodecError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| CodecError::Xlsx(format!("Failed to open Excel file: {}", e)))?;

    if !workbook.sheet_names().iter().any(|n| n == sheet) {
        return Err(CodecError::MissingSheet(sheet.to_string()));
    }
    read_sheet(&mut workbook, sheet)
}

/// List the sheet names of a workbook.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, CodecError> {
    let workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| CodecError::Xlsx(format!("Failed to open Excel file: {}", e)))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Write tables as a fresh workbook. Marked cells get the TPM fill.
pub fn write_workbook(path: &Path, tables: &[NamedTable]) -> Result<SaveReport, CodecError> {
    let mut report = SaveReport::default();
    let mut workbook = Workbook::new();
    let highlight = Format::new().set_background_color(Color::RGB(TPM_HIGHLIGHT));
    let plain = Format::new();
    let date_format = |kind: DateKind| Format::new().set_num_format(kind.num_format());
    let dates = [
        (DateKind::Date, date_format(DateKind::Date)),
        (DateKind::Time, date_format(DateKind::Time)),
        (DateKind::DateTime, date_format(DateKind::DateTime)),
    ];

    for named in tables {
        let worksheet = workbook
            .add_worksheet()
            .set_name(&named.name)
            .map_err(|e| CodecError::Xlsx(format!("Failed to create sheet '{}': {}", named.name, e)))?;

        for ((row, col), value) in named.table.cells_sorted() {
            let date = named
                .table
                .date_kind(row, col)
                .and_then(|kind| dates.iter().find(|(k, _)| *k == kind))
                .map(|(_, format)| format);
            let format = if named.table.is_marked(row, col) {
                report.tpm_cells += 1;
                &highlight
            } else if let Some(format) = date {
                format
            } else {
                &plain
            };
            let (row32, col16) = (row as u32, col as u16);
            let written = match value {
                CellValue::Number(n) => worksheet.write_number_with_format(row32, col16, *n, format),
                CellValue::Text(s) => worksheet.write_string_with_format(row32, col16, s, format),
                CellValue::Empty => continue,
            };
            written.map_err(|e| CodecError::Xlsx(format!("Failed to write cell ({}, {}): {}", row, col, e)))?;
            report.cells_written += 1;
        }
        report.sheets_written += 1;
    }

    workbook
        .save(path)
        .map_err(|e| CodecError::Xlsx(format!("Failed to save XLSX file: {}", e)))?;
    Ok(report)
}

/// Load a test from its sheet.
pub fn load_test(
    path: &Path,
    sheet: &str,
    variant: SchemaVariant,
    num_samples: usize,
    options: &CodecOptions,
) -> Result<TestRun, CodecError> {
    let table = read_table(path, sheet)?;
    log::info!("Read sheet '{}' from {}: {} cells", sheet, path.display(), table.cell_count());
    from_table(&table, sheet, variant, num_samples, options)
}

/// Save a test into its sheet.
///
/// When the file exists its other sheets and the header rows of the test's
/// sheet are carried over; only the data region is replaced. Otherwise a new
/// workbook with a single sheet is written.
pub fn save_test(path: &Path, test: &TestRun, layout: TableLayout) -> Result<SaveReport, CodecError> {
    let fresh = to_table(test, layout);
    let start = layout.data_start_row();

    let mut tables = if path.exists() { read_workbook(path)? } else { Vec::new() };
    let mut replaced_existing = false;
    match tables.iter_mut().find(|t| t.name == test.name()) {
        Some(existing) => {
            existing.table.replace_from_row(&fresh, start);
            replaced_existing = true;
        }
        None => tables.push(NamedTable {
            name: test.name().to_string(),
            table: fresh,
        }),
    }

    let mut report = write_workbook(path, &tables)?;
    report.replaced_existing = replaced_existing;
    log::info!(
        "Saved '{}' to {}: {} cells, {} TPM cells",
        test.name(),
        path.display(),
        report.cells_written,
        report.tpm_cells
    );
    Ok(report)
}
