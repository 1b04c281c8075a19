//! Grid reconciliation and auto-progression.
//!
//! The grid is edited freely; after each edit the caller hands over the new
//! snapshot together with the one it last synced. [`reconcile`] works out
//! what the technician did and what should follow from it:
//!
//! * An after-weight typed into the last weighed row carries over as the next
//!   row's before-weight, and the next row gets a puff count if it has none.
//! * A weight typed past the last puff count fills the puff column up to that
//!   row, one `puff_interval` per row, so no gaps are left.
//! * Before-weights alone, or both weights appearing at once (paste, import),
//!   never trigger progression.
//!
//! The function is pure. Grid writes come back as [`GridPatch`]es for the
//! caller to apply to whatever widget it renders.

use crate::cell::CellValue;
use crate::sample::Sample;
use crate::schema::Field;
use crate::snapshot::{same_cell, GridPatch, GridSnapshot};
use crate::tpm::{self, TpmPrecision};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileContext {
    pub puff_interval: u32,
    pub precision: TpmPrecision,
}

impl Default for ReconcileContext {
    fn default() -> Self {
        Self {
            puff_interval: 10,
            precision: TpmPrecision::default(),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// The rebuilt sample, TPM up to date.
    pub sample: Sample,
    /// Cell writes the grid must apply to match `sample`.
    pub patches: Vec<GridPatch>,
    /// `current` with `patches` applied; the next pass diffs against this.
    pub snapshot: GridSnapshot,
    /// Rows whose after-weight was carried into the following row.
    pub progressed_rows: Vec<usize>,
    /// Rows whose puff count was filled in automatically.
    pub filled_puff_rows: Vec<usize>,
    /// Any before/after weight differs from the previous sample state.
    pub weights_changed: bool,
    /// Any data cell differs from the previous snapshot or sample.
    pub changed: bool,
}

/// Highest row with a non-zero puff count, and that count.
fn last_puff(snapshot: &GridSnapshot, puff_col: usize) -> Option<(usize, i64)> {
    (0..snapshot.row_count()).rev().find_map(|row| {
        snapshot
            .get(row, puff_col)
            .as_number()
            .filter(|n| *n != 0.0)
            .map(|n| (row, n.trunc() as i64))
    })
}

/// Highest row with any after-weight.
fn last_after_weight(snapshot: &GridSnapshot, after_col: usize) -> Option<usize> {
    (0..snapshot.row_count())
        .rev()
        .find(|row| !snapshot.get(*row, after_col).is_empty())
}

fn became_filled(old: &CellValue, new: &CellValue) -> bool {
    old.is_empty() && !new.is_empty()
}

fn columns_differ(a: &[CellValue], b: &[CellValue]) -> bool {
    let rows = a.len().max(b.len());
    (0..rows).any(|i| {
        let empty = CellValue::Empty;
        !same_cell(a.get(i).unwrap_or(&empty), b.get(i).unwrap_or(&empty))
    })
}

/// Reconcile an edited grid against the last synced snapshot.
///
/// `previous` of `None` means there is nothing to diff against; no edit is
/// inferred and the grid is simply adopted.
pub fn reconcile(
    previous: Option<&GridSnapshot>,
    current: &GridSnapshot,
    sample: &Sample,
    ctx: &ReconcileContext,
) -> Reconciled {
    let variant = sample.variant;
    let puff_col = variant.puffs_col();
    let before_col = variant.before_weight_col();
    let after_col = variant.after_weight_col();
    let interval = ctx.puff_interval as i64;
    let previous = previous.unwrap_or(current);

    let mut working = current.clone();
    let mut patches: Vec<GridPatch> = Vec::new();
    let mut filled_puff_rows = Vec::new();

    // Reference points come from the grid as edited.
    let mut puff_anchor: Option<(i64, i64)> = last_puff(current, puff_col).map(|(r, v)| (r as i64, v));
    let last_after = last_after_weight(current, after_col);
    log::debug!(
        "{}: reconcile, last puff row {:?}, last after-weight row {:?}",
        sample.id,
        puff_anchor.map(|(r, _)| r),
        last_after
    );

    let mut scheduled: Vec<(usize, CellValue)> = Vec::new();

    for row in 0..current.row_count() {
        let old_before = previous.get(row, before_col);
        let old_after = previous.get(row, after_col);
        let new_before = current.get(row, before_col);
        let new_after = current.get(row, after_col);

        let before_changed = became_filled(old_before, new_before);
        let after_changed = became_filled(old_after, new_after);

        match (before_changed, after_changed) {
            (false, true) => {
                if last_after.map_or(true, |last| row >= last) {
                    log::debug!("{}: after-weight entered at row {}, scheduling progression", sample.id, row);
                    scheduled.push((row, new_after.clone()));
                } else {
                    log::debug!(
                        "{}: after-weight entered at row {} behind row {:?}, no progression",
                        sample.id,
                        row,
                        last_after
                    );
                }
            }
            (true, false) => {
                log::debug!("{}: before-weight entered at row {}, TPM only", sample.id, row);
            }
            (true, true) => {
                log::debug!("{}: both weights entered at row {}, treated as bulk entry", sample.id, row);
            }
            (false, false) => {}
        }

        // Puff auto-fill past the last known puff count.
        let past_anchor = puff_anchor.map_or(true, |(anchor, _)| row as i64 > anchor);
        if past_anchor && (before_changed || after_changed) && current.get(row, puff_col).is_empty() {
            let (anchor_row, anchor_value) = *puff_anchor.get_or_insert((-1, 0));
            for fill_row in (anchor_row + 1).max(0)..=row as i64 {
                let fill_row = fill_row as usize;
                if !working.get(fill_row, puff_col).is_empty() {
                    continue;
                }
                let Some(value) = (fill_row as i64 - anchor_row)
                    .checked_mul(interval)
                    .and_then(|step| anchor_value.checked_add(step))
                else {
                    log::warn!("{}: puff count past row {} overflows, not auto-filling", sample.id, anchor_row);
                    break;
                };
                let cell = CellValue::Number(value as f64);
                working.set(fill_row, puff_col, cell.clone());
                patches.push(GridPatch { row: fill_row, col: puff_col, value: cell });
                filled_puff_rows.push(fill_row);
                log::debug!("{}: auto-filled puffs at row {} with {}", sample.id, fill_row, value);
            }
        }
    }

    // Rebuild every array from the grid rather than patching in place.
    let mut rebuilt = Sample::empty(sample.id, variant);
    rebuilt.current_row_index = sample.current_row_index;
    rebuilt.avg_tpm = sample.avg_tpm;
    rebuilt.sample_notes = sample.sample_notes.clone();
    for row in &working.rows {
        let values = variant.data_fields().iter().map(|field| {
            let col = variant.column_of(*field).unwrap_or(usize::MAX);
            let raw = row.get(col).cloned().unwrap_or_default();
            (*field, field.coerce(&raw))
        });
        rebuilt.push_row(values, None);
    }

    // Progression runs only once the arrays reflect the whole grid.
    let mut progressed_rows = Vec::new();
    let rows = rebuilt.row_count();
    for (row, value) in scheduled {
        let next = row + 1;
        if next >= rows {
            log::debug!("{}: row {} is the last row, nothing to progress into", sample.id, row);
            continue;
        }
        let Some(weight) = value.as_number() else {
            log::debug!("{}: after-weight at row {} is not numeric, no progression", sample.id, row);
            continue;
        };

        let weight_cell = CellValue::Number(weight);
        rebuilt.set_cell(next, Field::BeforeWeight, weight_cell.clone());
        working.set(next, before_col, weight_cell.clone());
        patches.push(GridPatch { row: next, col: before_col, value: weight_cell });

        if rebuilt.cell(next, Field::Puffs).is_empty() {
            let base = rebuilt
                .cell(row, Field::Puffs)
                .as_number()
                .map(|n| n.trunc() as i64)
                .unwrap_or(0);
            match base.checked_add(interval) {
                Some(puffs) => {
                    let puff_cell = CellValue::Number(puffs as f64);
                    rebuilt.set_cell(next, Field::Puffs, puff_cell.clone());
                    working.set(next, puff_col, puff_cell.clone());
                    patches.push(GridPatch { row: next, col: puff_col, value: puff_cell });
                    filled_puff_rows.push(next);
                }
                None => log::warn!("{}: puff count at row {} overflows, row {} left empty", sample.id, row, next),
            }
        }

        log::debug!("{}: carried after-weight {} from row {} into row {}", sample.id, weight, row, next);
        progressed_rows.push(row);
    }

    let weights_changed = columns_differ(sample.before_weight(), rebuilt.before_weight())
        || columns_differ(sample.after_weight(), rebuilt.after_weight());
    let puffs_changed = columns_differ(sample.puffs(), rebuilt.puffs());

    if weights_changed || puffs_changed {
        tpm::recalculate(&mut rebuilt, ctx.precision);
    } else {
        rebuilt.tpm = sample.tpm.clone();
        rebuilt.tpm.resize(rows, None);
        rebuilt.avg_tpm = tpm::average(&rebuilt.tpm);
    }

    let data_changed = variant
        .data_fields()
        .iter()
        .any(|f| columns_differ(sample.column(*f), rebuilt.column(*f)));
    let changed = data_changed || previous.diff_count(&working, variant) > 0;

    Reconciled {
        sample: rebuilt,
        patches,
        snapshot: working,
        progressed_rows,
        filled_puff_rows,
        weights_changed,
        changed,
    }
}
