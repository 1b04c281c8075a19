//! TPM (total particulate mass per puff) calculation.
//!
//! For row `i` the puffs in the interval are `puffs[0]` on the first row and
//! `puffs[i] - puffs[i - 1]` afterwards. TPM is the weight lost over that
//! interval in milligrams per puff. A row whose weights are missing, not
//! numeric, or not strictly decreasing, or whose interval is not positive,
//! has no TPM.

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::sample::Sample;

/// Decimal places TPM values are rounded to. Applied identically by the
/// bulk and incremental paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpmPrecision {
    pub decimals: u32,
}

impl TpmPrecision {
    pub const FINE: Self = Self { decimals: 6 };
    pub const COARSE: Self = Self { decimals: 3 };

    pub fn new(decimals: u32) -> Self {
        // f64 carries ~15 significant digits; anything beyond is noise.
        Self { decimals: decimals.min(12) }
    }

    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.decimals as i32);
        (value * factor).round() / factor
    }
}

impl Default for TpmPrecision {
    fn default() -> Self {
        Self::FINE
    }
}

/// Result of a bulk TPM computation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TpmSeries {
    pub tpm: Vec<Option<f64>>,
    pub avg_tpm: f64,
}

impl TpmSeries {
    pub fn valid_count(&self) -> usize {
        self.tpm.iter().filter(|t| t.is_some()).count()
    }
}

/// Whole puffs in a cell. Fractional counts are truncated.
fn puff_count(cell: Option<&CellValue>) -> Option<i64> {
    cell.and_then(CellValue::as_number).map(|n| n.trunc() as i64)
}

/// Puffs consumed over the interval ending at `row`. `None` when the
/// difference does not fit in an `i64`.
pub fn interval_puffs(puffs: &[CellValue], row: usize) -> Option<i64> {
    let current = puff_count(puffs.get(row))?;
    if row == 0 {
        return Some(current);
    }
    let previous = puff_count(puffs.get(row - 1))?;
    current.checked_sub(previous)
}

/// TPM for a single row, or `None` if it is not computable.
pub fn row_tpm(
    puffs: &[CellValue],
    before: &[CellValue],
    after: &[CellValue],
    row: usize,
    precision: TpmPrecision,
) -> Option<f64> {
    let before = before.get(row).and_then(CellValue::as_number)?;
    let after = after.get(row).and_then(CellValue::as_number)?;
    if before <= after {
        return None;
    }

    let interval = interval_puffs(puffs, row)?;
    if interval <= 0 {
        return None;
    }

    let tpm = (before - after) * 1000.0 / interval as f64;
    if !tpm.is_finite() {
        return None;
    }
    Some(precision.round(tpm))
}

/// Mean of the computable values, `0.0` when there are none.
pub fn average(tpm: &[Option<f64>]) -> f64 {
    let (sum, count) = tpm
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Compute TPM for every row. The output is as long as the longest input.
pub fn compute_tpm(
    puffs: &[CellValue],
    before: &[CellValue],
    after: &[CellValue],
    precision: TpmPrecision,
) -> TpmSeries {
    let rows = puffs.len().max(before.len()).max(after.len());
    let tpm: Vec<Option<f64>> = (0..rows)
        .map(|row| row_tpm(puffs, before, after, row, precision))
        .collect();
    let avg_tpm = average(&tpm);
    TpmSeries { tpm, avg_tpm }
}

/// Bulk recompute of a sample's TPM column and average.
/// Returns true if at least one row has a TPM value.
pub fn recalculate(sample: &mut Sample, precision: TpmPrecision) -> bool {
    sample.repair_lengths();
    let series = compute_tpm(sample.puffs(), sample.before_weight(), sample.after_weight(), precision);
    let valid = series.valid_count();
    sample.tpm = series.tpm;
    sample.avg_tpm = series.avg_tpm;
    sample.repair_lengths();
    log::debug!("{}: recalculated TPM, {} valid rows, avg {:.6}", sample.id, valid, sample.avg_tpm);
    valid > 0
}

/// Incremental recompute after `row` changed.
///
/// A change to `puffs[row]` shifts the interval of every later row, so the
/// changed row and everything after it are recomputed.
pub fn recompute_from(sample: &mut Sample, row: usize, precision: TpmPrecision) {
    sample.repair_lengths();
    let rows = sample.row_count();
    for i in row.min(rows)..rows {
        let value = row_tpm(sample.puffs(), sample.before_weight(), sample.after_weight(), i, precision);
        sample.tpm[i] = value;
    }
    sample.avg_tpm = average(&sample.tpm);
}
