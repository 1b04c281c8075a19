// Per-sample CSV export

use std::path::{Path, PathBuf};

use tpmgrid_engine::{Field, Sample, TestRun};

use crate::error::CodecError;

/// Exported columns, in order. Fields a variant lacks export as blank.
const EXPORT_FIELDS: &[Field] = &[
    Field::Puffs,
    Field::BeforeWeight,
    Field::AfterWeight,
    Field::DrawPressure,
    Field::Smell,
    Field::Notes,
    Field::Tpm,
];

/// `{test}_{sample}_data.csv`
pub fn export_file_name(test_name: &str, sample_name: &str) -> String {
    format!("{}_{}_data.csv", test_name, sample_name)
}

fn record_for(sample: &Sample, row: usize) -> Vec<String> {
    EXPORT_FIELDS
        .iter()
        .map(|field| sample.cell(row, *field).raw_display())
        .collect()
}

/// Write one sample. Rows with neither weight are skipped.
pub fn export_sample(sample: &Sample, path: &Path) -> Result<usize, CodecError> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .map_err(|e| CodecError::Csv(e.to_string()))?;

    let header: Vec<&str> = EXPORT_FIELDS.iter().map(|f| f.label()).collect();
    writer.write_record(&header).map_err(|e| CodecError::Csv(e.to_string()))?;

    let mut rows = 0;
    for row in 0..sample.row_count() {
        let before = sample.cell(row, Field::BeforeWeight);
        let after = sample.cell(row, Field::AfterWeight);
        if before.is_empty() && after.is_empty() {
            continue;
        }
        writer
            .write_record(&record_for(sample, row))
            .map_err(|e| CodecError::Csv(e.to_string()))?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}

/// Write one CSV per sample into `dir`. `sample_names` overrides the file
/// name part for each sample by position; missing entries use `Sample {n}`.
pub fn export_samples(test: &TestRun, dir: &Path, sample_names: &[String]) -> Result<Vec<PathBuf>, CodecError> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(test.num_samples());
    for (index, sample) in test.samples().iter().enumerate() {
        let name = sample_names
            .get(index)
            .filter(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| sample.id.to_string());
        let path = dir.join(export_file_name(test.name(), &name));
        let rows = export_sample(sample, &path)?;
        log::debug!("{}: exported {} rows to {}", sample.id, rows, path.display());
        written.push(path);
    }
    log::info!("Exported {} CSV files to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use tpmgrid_engine::{SampleId, SchemaVariant, TestOptions};

    #[test]
    fn test_export_skips_rows_without_weights() {
        let dir = tempdir().unwrap();
        let mut test = TestRun::new("Extended Test", SchemaVariant::Standard, 2, TestOptions::default()).unwrap();
        test.set_cell(SampleId(1), 0, Field::BeforeWeight, "2.0").unwrap();
        test.set_cell(SampleId(1), 0, Field::AfterWeight, "1.5").unwrap();
        test.set_cell(SampleId(1), 1, Field::Notes, "no weights").unwrap();
        test.set_cell(SampleId(1), 2, Field::AfterWeight, "1.2").unwrap();

        let paths = export_samples(&test, dir.path(), &["A-17".to_string()]).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("Extended Test_A-17_data.csv"));
        assert!(paths[1].ends_with("Extended Test_Sample 2_data.csv"));

        let content = fs::read_to_string(&paths[0]).unwrap();
        let mut reader = csv::ReaderBuilder::new().from_reader(content.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("Puffs"));
        assert_eq!(headers.get(6), Some("TPM (mg/puff)"));

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(0), Some("10"));
        assert_eq!(records[0].get(2), Some("1.5"));
        assert_eq!(records[0].get(6), Some("50"));
        assert_eq!(records[1].get(0), Some("30"));
        assert_eq!(records[1].get(6), Some(""));

        let empty = fs::read_to_string(&paths[1]).unwrap();
        assert_eq!(empty.lines().count(), 1);
    }
}
