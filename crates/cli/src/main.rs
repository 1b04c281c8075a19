// tpmgrid CLI - headless operations on TPM test workbooks

mod exit_codes;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tpmgrid_config::Settings;
use tpmgrid_engine::validation::{validate_weight_entry, WeightCheck};
use tpmgrid_engine::{Field, SchemaVariant, TestRun};
use tpmgrid_io::{infer_sample_count, xlsx, CodecError, SaveGuard, TableLayout};

use exit_codes::{codec_exit_code, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tpmgrid")]
#[command(about = "Inspect, recalculate and export TPM test workbooks")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, env = "TPMGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-sample row counts and average TPM
    #[command(after_help = "\
Examples:
  tpmgrid summary study.xlsx --test 'Quick Screening Test'
  tpmgrid summary study.xlsx --test 'User Test Simulation' --samples 4 --json")]
    Summary {
        #[command(flatten)]
        source: TestSource,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Recompute every TPM value and write the sheet back
    Recalc {
        #[command(flatten)]
        source: TestSource,

        /// Write to this file instead of updating the workbook in place
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Write one CSV per sample
    #[command(after_help = "\
Files are named {test}_{sample}_data.csv. Rows without any weight are skipped.")]
    ExportCsv {
        #[command(flatten)]
        source: TestSource,

        /// Output directory
        #[arg(long, short = 'o', default_value = ".")]
        out_dir: PathBuf,

        /// Comma-separated sample names for the file names, in sample order
        #[arg(long, value_delimiter = ',')]
        names: Vec<String>,
    },

    /// Report implausible weight entries
    Check {
        #[command(flatten)]
        source: TestSource,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Workbook file
        workbook: PathBuf,
    },
}

#[derive(Args)]
struct TestSource {
    /// Workbook file (xlsx, xls, xlsb, ods)
    workbook: PathBuf,

    /// Sheet holding the test
    #[arg(long, short = 't')]
    test: String,

    /// Number of samples (inferred from the sheet width when omitted)
    #[arg(long, short = 'n')]
    samples: Option<usize>,

    /// Column layout of the sheet
    #[arg(long, value_enum, default_value_t = VariantArg::Auto)]
    variant: VariantArg,

    /// Data start: workbook, loaded_sheet, or a 0-indexed row
    #[arg(long)]
    layout: Option<TableLayout>,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    /// Decide from the test name
    Auto,
    Standard,
    UserSimulation,
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    fn codec(err: CodecError) -> Self {
        let hint = match &err {
            CodecError::SchemaMismatch { .. } => Some("check --samples and --variant against the sheet".to_string()),
            CodecError::MissingSheet(_) => Some("run `tpmgrid sheets <workbook>` to list sheet names".to_string()),
            _ => None,
        };
        Self { code: codec_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<CodecError> for CliError {
    fn from(err: CodecError) -> Self {
        Self::codec(err)
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("TPMGRID_COMMIT"), ")",
            "\nengine:  tpmgrid-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TPMGRID_TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("TPMGRID_COMMIT"), ")",
            "\nengine:  tpmgrid-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TPMGRID_TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    let result = match cli.command {
        Commands::Summary { source, json } => cmd_summary(&settings, &source, json),
        Commands::Recalc { source, output } => cmd_recalc(&settings, &source, output),
        Commands::ExportCsv { source, out_dir, names } => cmd_export_csv(&settings, &source, &out_dir, &names),
        Commands::Check { source } => cmd_check(&settings, &source),
        Commands::Sheets { workbook } => cmd_sheets(&workbook),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// shared
// ============================================================================

fn resolve_variant(arg: VariantArg, test_name: &str) -> SchemaVariant {
    match arg {
        VariantArg::Auto => SchemaVariant::for_test_name(test_name),
        VariantArg::Standard => SchemaVariant::Standard,
        VariantArg::UserSimulation => SchemaVariant::UserSimulation,
    }
}

fn load(settings: &Settings, source: &TestSource) -> Result<TestRun, CliError> {
    if !source.workbook.exists() {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("file not found: {}", source.workbook.display()),
            hint: None,
        });
    }

    let variant = resolve_variant(source.variant, &source.test);
    let mut options = settings.codec_options();
    if let Some(layout) = source.layout {
        options.layout = layout;
    }

    let table = xlsx::read_table(&source.workbook, &source.test)?;
    let num_samples = source
        .samples
        .unwrap_or_else(|| infer_sample_count(variant, table.cols));
    log::info!("{}: {} layout, {} samples", source.test, variant, num_samples);

    Ok(tpmgrid_io::from_table(&table, &source.test, variant, num_samples, &options)?)
}

fn write_out(line: std::fmt::Arguments<'_>) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", line).map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// summary
// ============================================================================

fn cmd_summary(settings: &Settings, source: &TestSource, json: bool) -> Result<(), CliError> {
    let test = load(settings, source)?;
    let decimals = test.precision().decimals as usize;

    if json {
        let samples: Vec<serde_json::Value> = test
            .samples()
            .iter()
            .map(|s| {
                serde_json::json!({
                    "sample": s.id.to_string(),
                    "rows": s.populated_rows(),
                    "tpm_rows": s.tpm.iter().filter(|t| t.is_some()).count(),
                    "avg_tpm": s.avg_tpm,
                })
            })
            .collect();
        let doc = serde_json::json!({
            "test": test.name(),
            "variant": test.variant().to_string(),
            "samples": samples,
        });
        let text = serde_json::to_string_pretty(&doc).map_err(|e| CliError::general(e.to_string()))?;
        return write_out(format_args!("{}", text));
    }

    write_out(format_args!("{} ({})", test.name(), test.variant()))?;
    write_out(format_args!("{:<12} {:>6} {:>9} {:>14}", "sample", "rows", "tpm rows", "avg tpm"))?;
    for s in test.samples() {
        let tpm_rows = s.tpm.iter().filter(|t| t.is_some()).count();
        write_out(format_args!(
            "{:<12} {:>6} {:>9} {:>14.*}",
            s.id.to_string(),
            s.populated_rows(),
            tpm_rows,
            decimals,
            s.avg_tpm
        ))?;
    }
    Ok(())
}

// ============================================================================
// recalc
// ============================================================================

fn cmd_recalc(settings: &Settings, source: &TestSource, output: Option<PathBuf>) -> Result<(), CliError> {
    let mut test = load(settings, source)?;
    let with_values = test.recalculate_all();

    let layout = source.layout.unwrap_or(settings.data_layout);
    let target = output.unwrap_or_else(|| source.workbook.clone());
    if target != source.workbook && source.workbook.exists() && !target.exists() {
        // Carry the other sheets over to the new file.
        std::fs::copy(&source.workbook, &target).map_err(|e| CliError::io(e.to_string()))?;
    }

    let guard = SaveGuard::new();
    let report = guard.save_now(|| xlsx::save_test(&target, &test, layout))?;
    test.mark_saved();

    write_out(format_args!(
        "{}: {} of {} samples have TPM values, {} TPM cells written to {}",
        test.name(),
        with_values,
        test.num_samples(),
        report.tpm_cells,
        target.display()
    ))
}

// ============================================================================
// export-csv
// ============================================================================

fn cmd_export_csv(settings: &Settings, source: &TestSource, out_dir: &Path, names: &[String]) -> Result<(), CliError> {
    let test = load(settings, source)?;
    let paths = tpmgrid_io::csv::export_samples(&test, out_dir, names)?;
    for path in paths {
        write_out(format_args!("{}", path.display()))?;
    }
    Ok(())
}

// ============================================================================
// check
// ============================================================================

fn cmd_check(settings: &Settings, source: &TestSource) -> Result<(), CliError> {
    let test = load(settings, source)?;
    let bounds = settings.weight_bounds();
    let mut problems = 0;

    for sample in test.samples() {
        for row in 0..sample.row_count() {
            for field in [Field::BeforeWeight, Field::AfterWeight] {
                let input = sample.cell(row, field).raw_display();
                let check = validate_weight_entry(sample, row, field, &input, &bounds);
                if !check.is_acceptable() {
                    problems += 1;
                    write_out(format_args!("{} row {} {}: {}", sample.id, row + 1, field.label(), check))?;
                }
            }
        }
    }

    if problems == 0 {
        return write_out(format_args!("{}: all weights plausible", test.name()));
    }
    Err(CliError::general(format!("{} implausible weight entries", problems)))
}

// ============================================================================
// sheets
// ============================================================================

fn cmd_sheets(workbook: &Path) -> Result<(), CliError> {
    for name in xlsx::sheet_names(workbook)? {
        write_out(format_args!("{}", name))?;
    }
    Ok(())
}
