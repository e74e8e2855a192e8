use std::collections::BTreeMap;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bridge::host::BridgeSettings;
use crate::matcher::vocabulary::{FieldRule, Vocabulary};

pub const DEFAULT_CONFIG_PATH: &str = "form-autofill.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-autofill",
    version,
    about = "Discover and fill form fields on arbitrary web pages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Append bridge traffic as JSON lines to this file
    #[arg(long, global = true)]
    pub trace: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape a page and list its fillable fields
    Discover {
        /// Local HTML file
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        html: Option<String>,

        /// Page URL (http, https or file)
        #[arg(long)]
        url: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Scrape a page, plan the fill from a profile and inject it
    Fill {
        /// Local HTML file
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        html: Option<String>,

        /// Page URL (http, https or file)
        #[arg(long)]
        url: Option<String>,

        /// Profile with the values to fill (YAML or JSON)
        #[arg(long)]
        profile: String,

        /// Run the content surface in a child process instead of a thread
        #[arg(long)]
        process: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Act as a content surface: NDJSON commands on stdin, messages on stdout
    Serve,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-autofill.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Overrides and additions to the built-in keyword lists
    #[serde(default)]
    pub vocabulary: BTreeMap<String, FieldRule>,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,

    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub forward_console: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: 10_000,
            operation_timeout_ms: 5_000,
            forward_console: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceConfig {
    pub path: Option<String>,
}

// Serde default helpers
fn default_ready_timeout() -> u64 { 10_000 }
fn default_operation_timeout() -> u64 { 5_000 }
fn default_true() -> bool { true }

impl AppConfig {
    /// Built-in vocabulary with this config's overrides applied.
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::builtin().merged(&self.vocabulary)
    }

    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            ready_timeout: Duration::from_millis(self.bridge.ready_timeout_ms),
            operation_timeout: Duration::from_millis(self.bridge.operation_timeout_ms),
        }
    }

    /// `--trace` wins over the config file.
    pub fn trace_path<'a>(&'a self, cli_trace: Option<&'a str>) -> Option<&'a str> {
        cli_trace.or(self.trace.path.as_deref())
    }
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if the file is missing;
/// a malformed file also yields defaults, with a warning.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "Malformed config, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, serde_yaml::Error> {
    // an empty file is a valid, empty config
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(content)
}
