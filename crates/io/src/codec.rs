//! Multi-sample tabular layout.
//!
//! Each sample occupies a fixed-width block of columns, `columns_per_sample`
//! wide, starting at `sample_index * columns_per_sample`. Inside a block the
//! fields appear in the variant's grid order with TPM last. Measurement rows
//! start at the layout's data row; anything above is header and is left to
//! whoever owns the sheet.

use tpmgrid_engine::sample::Sample;
use tpmgrid_engine::tpm;
use tpmgrid_engine::{CellValue, Field, SampleId, SchemaVariant, TestOptions, TestRun};

use crate::error::CodecError;
use crate::table::{Table, TableLayout};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CodecOptions {
    pub layout: TableLayout,
    pub test: TestOptions,
}

/// Narrowest table that can hold `num_samples` blocks of `variant`.
pub fn required_columns(variant: SchemaVariant, num_samples: usize) -> usize {
    match num_samples {
        0 => 0,
        n => (n - 1) * variant.columns_per_sample() + variant.fields().len(),
    }
}

/// Most sample blocks a table of `cols` columns can hold. At least one.
pub fn infer_sample_count(variant: SchemaVariant, cols: usize) -> usize {
    cols.saturating_sub(variant.fields().len()) / variant.columns_per_sample() + 1
}

/// Trim, then drop any wrapping `"` or `'` characters.
pub fn strip_quotes(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim_matches('\'').trim()
}

fn clean(value: &CellValue) -> CellValue {
    match value {
        CellValue::Text(s) => CellValue::Text(strip_quotes(s).to_string()),
        other => other.clone(),
    }
}

/// Render a test into a table. Rows with nothing but a puff count are
/// skipped unless the next row holds data, so every written row keeps its
/// puff interval on reload. TPM cells are marked for highlighting.
pub fn to_table(test: &TestRun, layout: TableLayout) -> Table {
    let variant = test.variant();
    let start = layout.data_start_row();
    let per_sample = variant.columns_per_sample();
    let mut table = Table::with_size(start, required_columns(variant, test.num_samples()));

    for (index, sample) in test.samples().iter().enumerate() {
        let offset = index * per_sample;

        if let Some(label_row) = layout.label_row() {
            for (col, field) in variant.fields().iter().enumerate() {
                table.set(label_row, offset + col, CellValue::Text(variant.label(*field).to_string()));
            }
        }

        let mut written = 0;
        let puff_col = variant.puffs_col();
        for row in 0..sample.row_count() {
            if !sample.row_has_data(row) {
                let puffs = sample.cell(row, Field::Puffs);
                if !puffs.is_empty() && sample.row_has_data(row + 1) {
                    table.set(start + row, offset + puff_col, Field::Puffs.coerce(&puffs));
                    written += 1;
                }
                continue;
            }
            let target = start + row;
            for (col, field) in variant.fields().iter().enumerate() {
                let value = field.coerce(&sample.cell(row, *field));
                if value.is_empty() {
                    continue;
                }
                table.set(target, offset + col, value);
                if *field == Field::Tpm {
                    table.mark(target, offset + col);
                }
            }
            written += 1;
        }
        log::debug!("{}: wrote {} rows at column offset {}", sample.id, written, offset);
    }

    table
}

/// Rebuild a test from a table.
///
/// A row is imported when any of the variant's key fields is non-empty after
/// quote stripping. TPM cells in the table are ignored and recomputed. A
/// sample block with no importable rows loads with no rows at all.
pub fn from_table(
    table: &Table,
    name: &str,
    variant: SchemaVariant,
    num_samples: usize,
    options: &CodecOptions,
) -> Result<TestRun, CodecError> {
    let required = required_columns(variant, num_samples);
    if !table.is_empty() && table.cols < required {
        log::warn!(
            "{}: table has {} columns, {} samples of {} need {}",
            name,
            table.cols,
            num_samples,
            variant,
            required
        );
        return Err(CodecError::SchemaMismatch { variant, required, found: table.cols });
    }

    let start = options.layout.data_start_row();
    let per_sample = variant.columns_per_sample();
    let data_fields = variant.data_fields();
    let mut samples = Vec::with_capacity(num_samples);

    for index in 0..num_samples {
        let id = SampleId::from_index(index);
        let offset = index * per_sample;
        let mut sample = Sample::empty(id, variant);

        for row in start..table.rows {
            let values: Vec<(Field, CellValue)> = data_fields
                .iter()
                .enumerate()
                .map(|(col, field)| (*field, field.coerce(&clean(table.get(row, offset + col)))))
                .collect();

            let meaningful = values
                .iter()
                .any(|(field, value)| variant.key_fields().contains(field) && !value.is_empty());
            if meaningful {
                sample.push_row(values, None);
            }
        }

        if sample.row_count() == 0 {
            log::debug!("{}: no data rows found", id);
        }
        tpm::recalculate(&mut sample, options.test.precision);
        log::debug!("{}: loaded {} rows, avg TPM {:.3}", id, sample.row_count(), sample.avg_tpm);
        samples.push(sample);
    }

    let test = TestRun::from_samples(name, variant, samples, options.test)?;
    log::info!("{}: loaded {} samples from table", name, test.num_samples());
    Ok(test)
}
