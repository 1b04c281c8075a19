// Application settings
// Loaded from ~/.config/tpmgrid/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tpmgrid_engine::test_run::DEFAULT_PUFF_INTERVAL;
use tpmgrid_engine::sample::DEFAULT_TEMPLATE_ROWS;
use tpmgrid_engine::validation::WeightBounds;
use tpmgrid_engine::{TestOptions, TpmPrecision};
use tpmgrid_io::{CodecOptions, TableLayout};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Test defaults
    #[serde(rename = "test.puffInterval")]
    pub puff_interval: u32,

    #[serde(rename = "test.templateRows")]
    pub template_rows: usize,

    // TPM
    #[serde(rename = "tpm.decimals")]
    pub tpm_decimals: u32,

    // File
    #[serde(rename = "file.dataLayout")]
    pub data_layout: TableLayout,

    #[serde(rename = "file.autoSaveInterval")]
    pub auto_save_interval: Option<u32>,  // seconds, None = disabled

    // Validation
    #[serde(rename = "validation.minWeight")]
    pub min_weight: f64,

    #[serde(rename = "validation.maxWeight")]
    pub max_weight: f64,
}

impl Default for Settings {
    fn default() -> Self {
        let bounds = WeightBounds::default();
        Self {
            // Test
            puff_interval: DEFAULT_PUFF_INTERVAL,
            template_rows: DEFAULT_TEMPLATE_ROWS,
            // TPM
            tpm_decimals: TpmPrecision::FINE.decimals,
            // File
            data_layout: TableLayout::Workbook,
            auto_save_interval: Some(300),
            // Validation
            min_weight: bounds.min,
            max_weight: bounds.max,
        }
    }
}

/// Drop lines that start with `//` so the file can carry comments.
fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tpmgrid");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load from a specific file. Any read or parse error yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Settings>(&strip_comments(&contents)) {
                Ok(settings) => settings.sanitized(),
                Err(e) => {
                    log::warn!("Error parsing {}: {}, using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Replace values the engine would reject with their defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.puff_interval == 0 {
            log::warn!("test.puffInterval must be positive, using {}", defaults.puff_interval);
            self.puff_interval = defaults.puff_interval;
        }
        if !(self.min_weight.is_finite() && self.max_weight.is_finite() && self.min_weight < self.max_weight) {
            log::warn!("validation weight bounds are invalid, using defaults");
            self.min_weight = defaults.min_weight;
            self.max_weight = defaults.max_weight;
        }
        self
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Test defaults
    "test.puffInterval": 10,
    "test.templateRows": 50,

    // TPM rounding (decimal places)
    "tpm.decimals": 6,

    // Data start row: "workbook" (row 5), "loaded_sheet" (row 4), or {"custom": N}
    "file.dataLayout": "workbook",

    // Auto-save every N seconds, null to disable
    "file.autoSaveInterval": 300,

    // Plausible weight range in grams
    "validation.minWeight": 0.001,
    "validation.maxWeight": 100.0
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }

    pub fn precision(&self) -> TpmPrecision {
        TpmPrecision::new(self.tpm_decimals)
    }

    pub fn weight_bounds(&self) -> WeightBounds {
        WeightBounds { min: self.min_weight, max: self.max_weight }
    }

    pub fn test_options(&self) -> TestOptions {
        TestOptions {
            puff_interval: self.puff_interval,
            precision: self.precision(),
            template_rows: self.template_rows,
        }
    }

    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            layout: self.data_layout,
            test: self.test_options(),
        }
    }

    pub fn auto_save_every(&self) -> Option<Duration> {
        self.auto_save_interval
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(secs as u64))
    }
}
