use std::env;
use std::fs;
use std::path::Path;

use menudex_core::config::{resolve_config_path, AppConfig};
use toml::Value;

use crate::commands::GlobalOptions;

pub fn run(options: &GlobalOptions) -> String {
    let config = match AppConfig::load(options.load_options()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(options.config.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    let dataset_source = if options.dataset.is_some() {
        "flag (--dataset)".to_string()
    } else {
        source("dataset.path", &["MENUDEX_DATASET_PATH"])
    };
    let dataset = config.dataset.path.as_deref().map(display_path).unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line("dataset.path", &dataset, dataset_source));

    lines.push(render_line(
        "resolver.accept_floor",
        &config.resolver.accept_floor.to_string(),
        source("resolver.accept_floor", &["MENUDEX_RESOLVER_ACCEPT_FLOOR"]),
    ));
    lines.push(render_line(
        "resolver.ambiguity_margin",
        &config.resolver.ambiguity_margin.to_string(),
        source("resolver.ambiguity_margin", &["MENUDEX_RESOLVER_AMBIGUITY_MARGIN"]),
    ));
    lines.push(render_line(
        "resolver.max_suggestions",
        &config.resolver.max_suggestions.to_string(),
        source("resolver.max_suggestions", &["MENUDEX_RESOLVER_MAX_SUGGESTIONS"]),
    ));
    lines.push(render_line(
        "resolver.max_candidates",
        &config.resolver.max_candidates.to_string(),
        source("resolver.max_candidates", &["MENUDEX_RESOLVER_MAX_CANDIDATES"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["MENUDEX_LOGGING_LEVEL", "MENUDEX_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        config.logging.format.as_str(),
        source("logging.format", &["MENUDEX_LOGGING_FORMAT", "MENUDEX_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        let set = env::var(env_key).map(|value| !value.trim().is_empty()).unwrap_or(false);
        if set {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
