use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::ResolverPolicy;

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["menudex.toml", "config/menudex.toml"];

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub resolver: ResolverPolicy,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetConfig {
    /// Catalog JSON document; commands that need a catalog fail without it.
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub dataset_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub accept_floor: Option<f64>,
    pub ambiguity_margin: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            resolver: ResolverPolicy::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(dataset) = patch.dataset {
            if let Some(path) = dataset.path {
                self.dataset.path = Some(path);
            }
        }

        if let Some(resolver) = patch.resolver {
            if let Some(accept_floor) = resolver.accept_floor {
                self.resolver.accept_floor = accept_floor;
            }
            if let Some(ambiguity_margin) = resolver.ambiguity_margin {
                self.resolver.ambiguity_margin = ambiguity_margin;
            }
            if let Some(max_suggestions) = resolver.max_suggestions {
                self.resolver.max_suggestions = max_suggestions;
            }
            if let Some(max_candidates) = resolver.max_candidates {
                self.resolver.max_candidates = max_candidates;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("MENUDEX_DATASET_PATH") {
            self.dataset.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("MENUDEX_RESOLVER_ACCEPT_FLOOR") {
            self.resolver.accept_floor = parse_f64("MENUDEX_RESOLVER_ACCEPT_FLOOR", &value)?;
        }
        if let Some(value) = read_env("MENUDEX_RESOLVER_AMBIGUITY_MARGIN") {
            self.resolver.ambiguity_margin = parse_f64("MENUDEX_RESOLVER_AMBIGUITY_MARGIN", &value)?;
        }
        if let Some(value) = read_env("MENUDEX_RESOLVER_MAX_SUGGESTIONS") {
            self.resolver.max_suggestions = parse_usize("MENUDEX_RESOLVER_MAX_SUGGESTIONS", &value)?;
        }
        if let Some(value) = read_env("MENUDEX_RESOLVER_MAX_CANDIDATES") {
            self.resolver.max_candidates = parse_usize("MENUDEX_RESOLVER_MAX_CANDIDATES", &value)?;
        }

        let log_level = read_env("MENUDEX_LOGGING_LEVEL").or_else(|| read_env("MENUDEX_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("MENUDEX_LOGGING_FORMAT").or_else(|| read_env("MENUDEX_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(dataset_path) = overrides.dataset_path {
            self.dataset.path = Some(dataset_path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(accept_floor) = overrides.accept_floor {
            self.resolver.accept_floor = accept_floor;
        }
        if let Some(ambiguity_margin) = overrides.ambiguity_margin {
            self.resolver.ambiguity_margin = ambiguity_margin;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_dataset(&self.dataset)?;
        validate_resolver(&self.resolver)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// First config file that exists, honouring an explicit path when given.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw =
        fs::read_to_string(path).map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key).map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_dataset(dataset: &DatasetConfig) -> Result<(), ConfigError> {
    if let Some(path) = &dataset.path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("dataset.path must not be empty when set".to_string()));
        }
    }
    Ok(())
}

fn validate_resolver(resolver: &ResolverPolicy) -> Result<(), ConfigError> {
    let floor = resolver.accept_floor;
    if !floor.is_finite() || floor <= 0.0 || floor > 1.0 {
        return Err(ConfigError::Validation("resolver.accept_floor must be in range (0, 1]".to_string()));
    }

    let margin = resolver.ambiguity_margin;
    if !margin.is_finite() || !(0.0..1.0).contains(&margin) {
        return Err(ConfigError::Validation("resolver.ambiguity_margin must be in range [0, 1)".to_string()));
    }

    if resolver.max_suggestions == 0 {
        return Err(ConfigError::Validation("resolver.max_suggestions must be greater than zero".to_string()));
    }

    if resolver.max_candidates < 2 {
        return Err(ConfigError::Validation("resolver.max_candidates must be at least 2".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation("logging.level must be one of trace|debug|info|warn|error".to_string())),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    dataset: Option<DatasetPatch>,
    resolver: Option<ResolverPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatasetPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResolverPatch {
    accept_floor: Option<f64>,
    ambiguity_margin: Option<f64>,
    max_suggestions: Option<usize>,
    max_candidates: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
