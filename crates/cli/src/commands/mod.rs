pub mod ask;
pub mod config;
pub mod doctor;
pub mod export;
pub mod query;
pub mod summary;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use menudex_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use menudex_core::{load_index, MenuIndex};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Success envelope carrying a structured result under `data`.
    pub fn success_with_data(command: &str, message: impl Into<String>, data: &impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => return Self::failure(command, "serialization", error.to_string(), 1),
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(command: &str, error_class: &str, message: impl Into<String>, exit_code: u8) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Options shared by every subcommand.
#[derive(Args, Clone, Debug, Default)]
pub struct GlobalOptions {
    #[arg(long, global = true, help = "Config file to load instead of menudex.toml")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Catalog JSON document, overriding dataset.path")]
    pub dataset: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides { dataset_path: self.dataset.clone(), ..ConfigOverrides::default() },
        }
    }
}

/// Loaded configuration plus the index built from its dataset.
pub struct Runtime {
    pub config: AppConfig,
    pub index: MenuIndex,
}

pub fn read_document(path: &Path) -> anyhow::Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("could not read dataset `{}`", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("dataset `{}` is not valid JSON", path.display()))
}

pub fn load_runtime(command: &str, options: &GlobalOptions) -> Result<Runtime, CommandResult> {
    let config = AppConfig::load(options.load_options()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })?;

    let Some(path) = config.dataset.path.clone() else {
        return Err(CommandResult::failure(
            command,
            "dataset_missing",
            "no dataset configured (set dataset.path, MENUDEX_DATASET_PATH or --dataset)",
            3,
        ));
    };

    let document = read_document(&path)
        .map_err(|error| CommandResult::failure(command, "dataset_unreadable", format!("{error:#}"), 4))?;
    let index = load_index(&document)
        .map_err(|error| CommandResult::failure(command, "catalog_load", error.to_string(), 5))?;

    info!(
        event_name = "cli.dataset_loaded",
        command,
        path = %path.display(),
        items = index.items().len(),
        warnings = index.warnings().len(),
        "dataset loaded"
    );
    Ok(Runtime { config, index })
}
