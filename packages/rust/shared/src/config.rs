//! Application configuration for the claims-merge tooling.
//!
//! User config lives at `~/.leadgen/leadgen.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadgenError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadgen.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadgen";

// ---------------------------------------------------------------------------
// Config structs (matching leadgen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Patch application behaviour.
    #[serde(default)]
    pub merge: MergeSection,

    /// Cross-reference / data-flow analysis settings.
    #[serde(default)]
    pub dataflow: DataFlowSection,

    /// Report output settings.
    #[serde(default)]
    pub report: ReportSection,
}

/// `[merge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSection {
    /// Fail the run when any patch is skipped or only partially applied.
    #[serde(default)]
    pub strict: bool,

    /// Emit one debug event per patch outcome.
    #[serde(default = "default_true")]
    pub log_patch_outcomes: bool,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            strict: false,
            log_patch_outcomes: default_true(),
        }
    }
}

/// `[dataflow]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowSection {
    /// Module id treated as the pipeline entry point (never reported as unreferenced).
    #[serde(default = "default_root_module_id")]
    pub root_module_id: String,

    /// A producer with strictly more distinct consumers than this is a bottleneck.
    #[serde(default = "default_bottleneck_threshold")]
    pub bottleneck_threshold: usize,
}

impl Default for DataFlowSection {
    fn default() -> Self {
        Self {
            root_module_id: default_root_module_id(),
            bottleneck_threshold: default_bottleneck_threshold(),
        }
    }
}

fn default_root_module_id() -> String {
    "1".into()
}
fn default_bottleneck_threshold() -> usize {
    3
}

/// `[report]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    /// Directory merge reports are written under.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "var/merge-runs".into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Runtime options (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime patch-application options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Reject the run when diagnostics are non-empty.
    pub strict: bool,
    /// Log every patch outcome at debug level.
    pub log_patch_outcomes: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            log_patch_outcomes: true,
        }
    }
}

impl From<&AppConfig> for MergeOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            strict: config.merge.strict,
            log_patch_outcomes: config.merge.log_patch_outcomes,
        }
    }
}

/// Runtime data-flow analysis options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFlowConfig {
    /// Entry module id, excluded from the unreferenced-output check.
    pub root_module_id: String,
    /// Bottleneck threshold (strict `>` comparison).
    pub bottleneck_threshold: usize,
}

impl Default for DataFlowConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for DataFlowConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            root_module_id: config.dataflow.root_module_id.clone(),
            bottleneck_threshold: config.dataflow.bottleneck_threshold,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadgen/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadgenError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadgen/leadgen.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadgenError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        LeadgenError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadgenError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadgenError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadgenError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values that would make the analysis meaningless.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.dataflow.root_module_id.trim().is_empty() {
        return Err(LeadgenError::config("dataflow.root_module_id must not be empty"));
    }
    if config.report.output_dir.trim().is_empty() {
        return Err(LeadgenError::config("report.output_dir must not be empty"));
    }
    Ok(())
}
