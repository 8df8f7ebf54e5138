//! Application configuration for epicreport.
//!
//! User config lives at `~/.epicreport/epicreport.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::types::EpicQuery;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "epicreport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".epicreport";

// ---------------------------------------------------------------------------
// Config structs (matching epicreport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Azure DevOps connection and query selection.
    #[serde(default)]
    pub azure_devops: AzureDevOpsConfig,

    /// Report presentation.
    #[serde(default)]
    pub report: ReportConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Output format: md, json, word, or all.
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: default_format(),
        }
    }
}

fn default_output_dir() -> String {
    "reports".into()
}
fn default_format() -> String {
    "word".into()
}

/// `[azure_devops]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureDevOpsConfig {
    /// Organization name (`https://dev.azure.com/<organization>`).
    #[serde(default)]
    pub organization: String,

    /// Project containing the epics.
    #[serde(default = "default_project")]
    pub project: String,

    /// Area path the epics live under.
    #[serde(default = "default_area_path")]
    pub area_path: String,

    /// Iteration path the epics are planned in.
    #[serde(default = "default_iteration_path")]
    pub iteration_path: String,

    /// Name of the env var holding the personal access token (never store the token itself).
    #[serde(default = "default_pat_env")]
    pub pat_env: String,

    /// Service root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// REST API version query parameter.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        Self {
            organization: String::new(),
            project: default_project(),
            area_path: default_area_path(),
            iteration_path: default_iteration_path(),
            pat_env: default_pat_env(),
            base_url: default_base_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_project() -> String {
    "One".into()
}
fn default_area_path() -> String {
    "One\\CloudInit".into()
}
fn default_iteration_path() -> String {
    "One\\Bromine".into()
}
fn default_pat_env() -> String {
    "AZURE_DEVOPS_PAT".into()
}
fn default_base_url() -> String {
    "https://dev.azure.com".into()
}
fn default_api_version() -> String {
    "7.1".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl AzureDevOpsConfig {
    /// The epic selection described by this section.
    pub fn query(&self) -> EpicQuery {
        EpicQuery {
            project: self.project.clone(),
            area_path: self.area_path.clone(),
            iteration_path: self.iteration_path.clone(),
        }
    }
}

/// `[report]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Name used in the report title and output file names.
    #[serde(default = "default_project_name")]
    pub project_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
        }
    }
}

fn default_project_name() -> String {
    "CloudInit".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.epicreport/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ReportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.epicreport/epicreport.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ReportError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReportError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReportError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReportError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the personal access token from the env var named in config.
pub fn read_pat(config: &AzureDevOpsConfig) -> Result<String> {
    let var_name = &config.pat_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ReportError::config(format!(
            "Azure DevOps token not found. Set the {var_name} environment variable \
             to a personal access token with Work Items (Read) scope."
        ))),
    }
}
