use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::boxes::{validate_box_policy, DEFAULT_BOX_POLICY};
use crate::resolver::{ResolverOptions, DEFAULT_CONFIDENCE_FLOOR, DEFAULT_RESOLVER_POLICY};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.92;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data: DataConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub catalog_path: PathBuf,
    pub rules_path: PathBuf,
    pub packing_table_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub policy: String,
    pub box_allocation_policy: String,
    pub confidence_floor: f64,
    pub match_threshold: f64,
    pub assumptions_public: bool,
}

#[derive(Clone, Debug)]
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
    pub catalog_path: Option<PathBuf>,
    pub rules_path: Option<PathBuf>,
    pub packing_table_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub confidence_floor: Option<f64>,
    pub match_threshold: Option<f64>,
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
            data: DataConfig {
                catalog_path: PathBuf::from("data/catalog.json"),
                rules_path: PathBuf::from("data/moving_rules.json"),
                packing_table_path: Some(PathBuf::from("data/packing_rates.tsv")),
            },
            resolver: ResolverConfig {
                policy: DEFAULT_RESOLVER_POLICY.to_string(),
                box_allocation_policy: DEFAULT_BOX_POLICY.to_string(),
                confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
                match_threshold: DEFAULT_MATCH_THRESHOLD,
                assumptions_public: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
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

impl ResolverConfig {
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            resolver_policy: self.policy.clone(),
            box_allocation_policy: self.box_allocation_policy.clone(),
            confidence_floor: self.confidence_floor,
            assumptions_public: self.assumptions_public,
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("movequote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            if let Some(catalog_path) = data.catalog_path {
                self.data.catalog_path = catalog_path;
            }
            if let Some(rules_path) = data.rules_path {
                self.data.rules_path = rules_path;
            }
            if let Some(packing_table_path) = data.packing_table_path {
                self.data.packing_table_path = optional_path(packing_table_path);
            }
        }

        if let Some(resolver) = patch.resolver {
            if let Some(policy) = resolver.policy {
                self.resolver.policy = policy;
            }
            if let Some(box_allocation_policy) = resolver.box_allocation_policy {
                self.resolver.box_allocation_policy = box_allocation_policy;
            }
            if let Some(confidence_floor) = resolver.confidence_floor {
                self.resolver.confidence_floor = confidence_floor;
            }
            if let Some(match_threshold) = resolver.match_threshold {
                self.resolver.match_threshold = match_threshold;
            }
            if let Some(assumptions_public) = resolver.assumptions_public {
                self.resolver.assumptions_public = assumptions_public;
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
        if let Some(value) = read_env("MOVEQUOTE_DATA_CATALOG_PATH") {
            self.data.catalog_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("MOVEQUOTE_DATA_RULES_PATH") {
            self.data.rules_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("MOVEQUOTE_DATA_PACKING_TABLE_PATH") {
            self.data.packing_table_path = optional_path(PathBuf::from(value));
        }

        if let Some(value) = read_env("MOVEQUOTE_RESOLVER_POLICY") {
            self.resolver.policy = value;
        }
        if let Some(value) = read_env("MOVEQUOTE_RESOLVER_BOX_ALLOCATION_POLICY") {
            self.resolver.box_allocation_policy = value;
        }
        if let Some(value) = read_env("MOVEQUOTE_RESOLVER_CONFIDENCE_FLOOR") {
            self.resolver.confidence_floor =
                parse_f64("MOVEQUOTE_RESOLVER_CONFIDENCE_FLOOR", &value)?;
        }
        if let Some(value) = read_env("MOVEQUOTE_RESOLVER_MATCH_THRESHOLD") {
            self.resolver.match_threshold =
                parse_f64("MOVEQUOTE_RESOLVER_MATCH_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("MOVEQUOTE_RESOLVER_ASSUMPTIONS_PUBLIC") {
            self.resolver.assumptions_public =
                parse_bool("MOVEQUOTE_RESOLVER_ASSUMPTIONS_PUBLIC", &value)?;
        }

        let log_level =
            read_env("MOVEQUOTE_LOGGING_LEVEL").or_else(|| read_env("MOVEQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MOVEQUOTE_LOGGING_FORMAT").or_else(|| read_env("MOVEQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.data.catalog_path = catalog_path;
        }
        if let Some(rules_path) = overrides.rules_path {
            self.data.rules_path = rules_path;
        }
        if let Some(packing_table_path) = overrides.packing_table_path {
            self.data.packing_table_path = optional_path(packing_table_path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(confidence_floor) = overrides.confidence_floor {
            self.resolver.confidence_floor = confidence_floor;
        }
        if let Some(match_threshold) = overrides.match_threshold {
            self.resolver.match_threshold = match_threshold;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_data(&self.data)?;
        validate_resolver(&self.resolver)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

// An empty packing table path disables the table.
fn optional_path(path: PathBuf) -> Option<PathBuf> {
    (!path.as_os_str().is_empty()).then_some(path)
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("movequote.toml"), PathBuf::from("config/movequote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

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

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    if data.catalog_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("data.catalog_path must not be empty".to_string()));
    }
    if data.rules_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("data.rules_path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_resolver(resolver: &ResolverConfig) -> Result<(), ConfigError> {
    if resolver.policy.trim().is_empty() {
        return Err(ConfigError::Validation("resolver.policy must not be empty".to_string()));
    }

    if !(0.0..=1.0).contains(&resolver.confidence_floor) {
        return Err(ConfigError::Validation(
            "resolver.confidence_floor must be in range 0..=1".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&resolver.match_threshold) {
        return Err(ConfigError::Validation(
            "resolver.match_threshold must be in range 0..=1".to_string(),
        ));
    }

    validate_box_policy(&resolver.box_allocation_policy).map_err(|error| {
        ConfigError::Validation(format!("resolver.box_allocation_policy is invalid: {error}"))
    })
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    resolver: Option<ResolverPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    catalog_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    packing_table_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ResolverPatch {
    policy: Option<String>,
    box_allocation_policy: Option<String>,
    confidence_floor: Option<f64>,
    match_threshold: Option<f64>,
    assumptions_public: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_and_point_at_shipped_data() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| format!("defaults should validate: {err}"))?;

        ensure(
            config.data.catalog_path == PathBuf::from("data/catalog.json"),
            "default catalog path should be data/catalog.json",
        )?;
        ensure(config.resolver.box_allocation_policy == "50/35/10/5", "default box policy")?;
        ensure(
            (config.resolver.confidence_floor - 0.65).abs() < f64::EPSILON,
            "default confidence floor should be 0.65",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_MOVEQUOTE_DATA_DIR", "/srv/movequote");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("movequote.toml");
            fs::write(
                &path,
                r#"
[data]
catalog_path = "${TEST_MOVEQUOTE_DATA_DIR}/catalog.json"
rules_path = "${TEST_MOVEQUOTE_DATA_DIR}/rules.json"
packing_table_path = ""
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.catalog_path == PathBuf::from("/srv/movequote/catalog.json"),
                "catalog path should be interpolated from environment",
            )?;
            ensure(
                config.data.rules_path == PathBuf::from("/srv/movequote/rules.json"),
                "rules path should be interpolated from environment",
            )?;
            ensure(
                config.data.packing_table_path.is_none(),
                "empty packing table path should disable the table",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_MOVEQUOTE_DATA_DIR"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_MOVEQUOTE_UNSET_VAR"]);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("movequote.toml");
        fs::write(&path, "[data]\ncatalog_path = \"${TEST_MOVEQUOTE_UNSET_VAR}\"\n")
            .map_err(|err| err.to_string())?;

        let error =
            match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            {
                Ok(_) => return Err("expected interpolation failure".to_string()),
                Err(error) => error,
            };
        ensure(
            matches!(
                error,
                ConfigError::MissingEnvInterpolation { ref var } if var == "TEST_MOVEQUOTE_UNSET_VAR"
            ),
            "missing variable should be named in the error",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MOVEQUOTE_LOG_LEVEL", "warn");
        env::set_var("MOVEQUOTE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["MOVEQUOTE_LOG_LEVEL", "MOVEQUOTE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MOVEQUOTE_DATA_CATALOG_PATH", "/env/catalog.json");
        env::set_var("MOVEQUOTE_RESOLVER_CONFIDENCE_FLOOR", "0.7");
        env::set_var("MOVEQUOTE_RESOLVER_ASSUMPTIONS_PUBLIC", "false");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("movequote.toml");
            fs::write(
                &path,
                r#"
[data]
catalog_path = "/file/catalog.json"
rules_path = "/file/rules.json"

[resolver]
confidence_floor = 0.6
box_allocation_policy = "40/40/10/10"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    catalog_path: Some(PathBuf::from("/override/catalog.json")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.catalog_path == PathBuf::from("/override/catalog.json"),
                "override catalog path should win",
            )?;
            ensure(
                config.data.rules_path == PathBuf::from("/file/rules.json"),
                "file rules path should win over defaults",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                (config.resolver.confidence_floor - 0.7).abs() < f64::EPSILON,
                "env confidence floor should win over file and defaults",
            )?;
            ensure(!config.resolver.assumptions_public, "env should hide assumptions")?;
            ensure(
                config.resolver.box_allocation_policy == "40/40/10/10",
                "file box policy should win over defaults",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "MOVEQUOTE_DATA_CATALOG_PATH",
            "MOVEQUOTE_RESOLVER_CONFIDENCE_FLOOR",
            "MOVEQUOTE_RESOLVER_ASSUMPTIONS_PUBLIC",
        ]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MOVEQUOTE_RESOLVER_CONFIDENCE_FLOOR", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("resolver.confidence_floor")
            );
            ensure(has_message, "validation failure should mention resolver.confidence_floor")
        })();

        clear_vars(&["MOVEQUOTE_RESOLVER_CONFIDENCE_FLOOR"]);
        result
    }

    #[test]
    fn malformed_box_policy_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MOVEQUOTE_RESOLVER_BOX_ALLOCATION_POLICY", "50/50");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected box policy validation failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::Validation(ref message)
                        if message.contains("resolver.box_allocation_policy")
                ),
                "validation failure should mention resolver.box_allocation_policy",
            )
        })();

        clear_vars(&["MOVEQUOTE_RESOLVER_BOX_ALLOCATION_POLICY"]);
        result
    }

    #[test]
    fn non_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MOVEQUOTE_RESOLVER_MATCH_THRESHOLD", "high");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "MOVEQUOTE_RESOLVER_MATCH_THRESHOLD"
                ),
                "invalid override should name the variable",
            )
        })();

        clear_vars(&["MOVEQUOTE_RESOLVER_MATCH_THRESHOLD"]);
        result
    }

    #[test]
    fn required_file_missing_is_reported() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should be reported",
        )
    }
}
