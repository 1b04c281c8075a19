// Integration tests for the tpmgrid binary against workbooks built in a tempdir.
// Run with: cargo test -p tpmgrid-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tpmgrid_engine::{Field, SampleId, SchemaVariant, TestOptions, TestRun};
use tpmgrid_io::{xlsx, TableLayout};

const TEST_NAME: &str = "Quick Screening Test";

fn tpmgrid(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tpmgrid"));
    cmd.env("TPMGRID_CONFIG", config);
    cmd
}

/// Two samples: sample 1 has one valid interval (50 mg/puff), sample 2 has
/// an after weight above its before weight.
fn build_workbook(dir: &Path) -> (PathBuf, PathBuf) {
    let config = dir.join("settings.json");
    std::fs::write(&config, "{\n  // test settings\n  \"tpm.decimals\": 3\n}\n").unwrap();

    let mut test = TestRun::new(TEST_NAME, SchemaVariant::Standard, 2, TestOptions::default()).unwrap();
    test.set_cell(SampleId(1), 0, Field::BeforeWeight, "2.0").unwrap();
    test.set_cell(SampleId(1), 0, Field::AfterWeight, "1.5").unwrap();
    test.set_cell(SampleId(2), 0, Field::BeforeWeight, "1.5").unwrap();
    test.set_cell(SampleId(2), 0, Field::AfterWeight, "1.6").unwrap();

    let path = dir.join("study.xlsx");
    xlsx::save_test(&path, &test, TableLayout::Workbook).unwrap();
    (path, config)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn summary_json_infers_sample_count() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, config) = build_workbook(dir.path());

    let output = tpmgrid(&config)
        .args(["summary", workbook.to_str().unwrap(), "--test", TEST_NAME, "--json"])
        .output()
        .expect("tpmgrid summary --json");
    assert!(output.status.success(), "exit code was {:?}", output.status);

    let doc: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(doc["test"], TEST_NAME);
    assert_eq!(doc["variant"], "standard");

    let samples = doc["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0]["sample"], "Sample 1");
    assert_eq!(samples[0]["tpm_rows"], 1);
    assert_eq!(samples[0]["avg_tpm"].as_f64(), Some(50.0));
    assert_eq!(samples[1]["tpm_rows"], 0);
}

#[test]
fn summary_text_lists_each_sample() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, config) = build_workbook(dir.path());

    let output = tpmgrid(&config)
        .args(["summary", workbook.to_str().unwrap(), "--test", TEST_NAME])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.starts_with("Quick Screening Test (standard)"));
    assert!(text.contains("Sample 1"));
    assert!(text.contains("Sample 2"));
    assert!(text.contains("50.000"), "three decimals from settings: {}", text);
}

#[test]
fn missing_sheet_exits_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, config) = build_workbook(dir.path());

    let output = tpmgrid(&config)
        .args(["summary", workbook.to_str().unwrap(), "--test", "No Such Test"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"));
    assert!(stderr.contains("tpmgrid sheets"));
}

#[test]
fn too_many_samples_is_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, config) = build_workbook(dir.path());

    let output = tpmgrid(&config)
        .args(["summary", workbook.to_str().unwrap(), "--test", TEST_NAME, "--samples", "3"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn missing_file_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");

    let output = tpmgrid(&config)
        .args(["summary", "nope.xlsx", "--test", TEST_NAME])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn sheets_lists_test_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, config) = build_workbook(dir.path());

    let output = tpmgrid(&config)
        .args(["sheets", workbook.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), TEST_NAME);
}

#[test]
fn recalc_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, config) = build_workbook(dir.path());
    let target = dir.path().join("recalculated.xlsx");

    let output = tpmgrid(&config)
        .args(["recalc", workbook.to_str().unwrap(), "--test", TEST_NAME, "-o", target.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("1 of 2 samples have TPM values"));

    let table = xlsx::read_table(&target, TEST_NAME).unwrap();
    // Sample 1 TPM column, first data row.
    assert_eq!(table.get(4, 8).as_number(), Some(50.0));
}

#[test]
fn export_csv_uses_given_names() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, config) = build_workbook(dir.path());
    let out = dir.path().join("csv");

    let output = tpmgrid(&config)
        .args([
            "export-csv",
            workbook.to_str().unwrap(),
            "--test",
            TEST_NAME,
            "--out-dir",
            out.to_str().unwrap(),
            "--names",
            "Alpha,Beta",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    assert!(out.join("Quick Screening Test_Alpha_data.csv").exists());
    assert!(out.join("Quick Screening Test_Beta_data.csv").exists());
}

#[test]
fn check_flags_inverted_weights() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, config) = build_workbook(dir.path());

    let output = tpmgrid(&config)
        .args(["check", workbook.to_str().unwrap(), "--test", TEST_NAME])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let text = stdout(&output);
    assert!(text.contains("Sample 2 row 1"));
    assert!(!text.contains("Sample 1"));
}

#[test]
fn long_version_reports_build() {
    let dir = tempfile::tempdir().unwrap();
    let output = tpmgrid(&dir.path().join("settings.json"))
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains(env!("CARGO_PKG_VERSION")));
    assert!(text.contains("engine:  tpmgrid-engine"));
    assert!(text.contains("target:  "));
}
