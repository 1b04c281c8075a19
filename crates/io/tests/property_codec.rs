// Property-based tests for the tabular codec.
// CI: 128 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use tpmgrid_engine::{CellValue, Field, Sample, SampleId, SchemaVariant, TestOptions, TestRun};
use tpmgrid_io::{from_table, to_table, CodecOptions, TableLayout};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_128() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

const TEMPLATE_ROWS: usize = 12;

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Cell input: mostly weights, sometimes words, sometimes blank.
fn arb_input() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0.001..100.0f64).prop_map(|v| format!("{:.3}", v)),
        1 => r"[a-z]{1,8}",
        1 => Just(String::new()),
    ]
}

#[derive(Debug, Clone)]
struct Edit {
    sample: usize,
    row: usize,
    field: usize,
    input: String,
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    (0usize..3, 0..TEMPLATE_ROWS, 0usize..16, arb_input()).prop_map(|(sample, row, field, input)| Edit {
        sample,
        row,
        field,
        input,
    })
}

fn arb_layout() -> impl Strategy<Value = TableLayout> {
    prop_oneof![
        Just(TableLayout::Workbook),
        Just(TableLayout::LoadedSheet),
        (0usize..8).prop_map(TableLayout::Custom),
    ]
}

fn build(variant: SchemaVariant, num_samples: usize, edits: &[Edit]) -> TestRun {
    let options = TestOptions { template_rows: TEMPLATE_ROWS, ..TestOptions::default() };
    let mut test = TestRun::new("t", variant, num_samples, options).unwrap();
    // Puffs stay on the template so every written row is importable.
    let editable: Vec<Field> = variant.data_fields().iter().copied().filter(|f| *f != Field::Puffs).collect();
    for edit in edits {
        let id = SampleId::from_index(edit.sample % num_samples);
        let field = editable[edit.field % editable.len()];
        test.set_cell(id, edit.row, field, &edit.input).unwrap();
    }
    test
}

/// Data-field values of every row that holds data, in order.
fn meaningful_rows(sample: &Sample) -> Vec<Vec<CellValue>> {
    (0..sample.row_count())
        .filter(|row| sample.row_has_data(*row))
        .map(|row| {
            sample
                .variant
                .data_fields()
                .iter()
                .map(|f| f.coerce(&sample.cell(row, *f)))
                .collect()
        })
        .collect()
}

fn tpm_values(sample: &Sample) -> Vec<f64> {
    sample.tpm.iter().flatten().copied().collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_128())]

    #[test]
    fn round_trip_keeps_meaningful_rows(
        user_sim in any::<bool>(),
        num_samples in 1usize..=3,
        edits in prop::collection::vec(arb_edit(), 0..24),
        layout in arb_layout(),
    ) {
        let variant = if user_sim { SchemaVariant::UserSimulation } else { SchemaVariant::Standard };
        let original = build(variant, num_samples, &edits);
        let options = CodecOptions { layout, test: original.options() };

        let table = to_table(&original, layout);
        let loaded = from_table(&table, "t", variant, num_samples, &options).unwrap();

        prop_assert_eq!(loaded.num_samples(), num_samples);
        // Template puffs are never cleared, so every data row keeps its interval.
        for (before, after) in original.samples().iter().zip(loaded.samples()) {
            prop_assert_eq!(meaningful_rows(before), meaningful_rows(after));
            prop_assert_eq!(tpm_values(before), tpm_values(after));
            prop_assert_eq!(before.avg_tpm, after.avg_tpm);
        }
    }

    #[test]
    fn second_round_trip_is_identity(
        user_sim in any::<bool>(),
        num_samples in 1usize..=3,
        edits in prop::collection::vec(arb_edit(), 0..24),
        layout in arb_layout(),
    ) {
        let variant = if user_sim { SchemaVariant::UserSimulation } else { SchemaVariant::Standard };
        let original = build(variant, num_samples, &edits);
        let options = CodecOptions { layout, test: original.options() };

        let once = from_table(&to_table(&original, layout), "t", variant, num_samples, &options).unwrap();
        let twice = from_table(&to_table(&once, layout), "t", variant, num_samples, &options).unwrap();
        prop_assert_eq!(once.samples(), twice.samples());
        prop_assert_eq!(to_table(&once, layout), to_table(&twice, layout));
    }
}
