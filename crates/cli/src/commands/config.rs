use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use movequote_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use toml::Value;

use super::{load_config, CommandResult};

const COMMAND: &str = "config";

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

#[derive(Debug, Serialize)]
struct ConfigReport {
    config_file: Option<String>,
    entries: Vec<ConfigEntry>,
}

struct FieldSpec {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    overridden: bool,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries = field_specs(&config, options)
        .into_iter()
        .map(|field| ConfigEntry {
            key: field.key,
            source: field_source(
                &field,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
            value: field.value,
        })
        .collect();

    let report = ConfigReport {
        config_file: config_file_path.map(|path| path.display().to_string()),
        entries,
    };
    CommandResult::success_with(
        COMMAND,
        "effective config (source precedence: override > env > file > default)",
        &report,
    )
}

fn field_specs(config: &AppConfig, options: &LoadOptions) -> Vec<FieldSpec> {
    let overrides = &options.overrides;
    let resolver = &config.resolver;
    vec![
        FieldSpec {
            key: "data.catalog_path",
            value: config.data.catalog_path.display().to_string(),
            env_keys: &["MOVEQUOTE_DATA_CATALOG_PATH"],
            overridden: overrides.catalog_path.is_some(),
        },
        FieldSpec {
            key: "data.rules_path",
            value: config.data.rules_path.display().to_string(),
            env_keys: &["MOVEQUOTE_DATA_RULES_PATH"],
            overridden: overrides.rules_path.is_some(),
        },
        FieldSpec {
            key: "data.packing_table_path",
            value: config
                .data
                .packing_table_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["MOVEQUOTE_DATA_PACKING_TABLE_PATH"],
            overridden: overrides.packing_table_path.is_some(),
        },
        FieldSpec {
            key: "resolver.policy",
            value: resolver.policy.clone(),
            env_keys: &["MOVEQUOTE_RESOLVER_POLICY"],
            overridden: false,
        },
        FieldSpec {
            key: "resolver.box_allocation_policy",
            value: resolver.box_allocation_policy.clone(),
            env_keys: &["MOVEQUOTE_RESOLVER_BOX_ALLOCATION_POLICY"],
            overridden: false,
        },
        FieldSpec {
            key: "resolver.confidence_floor",
            value: resolver.confidence_floor.to_string(),
            env_keys: &["MOVEQUOTE_RESOLVER_CONFIDENCE_FLOOR"],
            overridden: overrides.confidence_floor.is_some(),
        },
        FieldSpec {
            key: "resolver.match_threshold",
            value: resolver.match_threshold.to_string(),
            env_keys: &["MOVEQUOTE_RESOLVER_MATCH_THRESHOLD"],
            overridden: overrides.match_threshold.is_some(),
        },
        FieldSpec {
            key: "resolver.assumptions_public",
            value: resolver.assumptions_public.to_string(),
            env_keys: &["MOVEQUOTE_RESOLVER_ASSUMPTIONS_PUBLIC"],
            overridden: false,
        },
        FieldSpec {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["MOVEQUOTE_LOGGING_LEVEL", "MOVEQUOTE_LOG_LEVEL"],
            overridden: overrides.log_level.is_some(),
        },
        FieldSpec {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_lowercase(),
            env_keys: &["MOVEQUOTE_LOGGING_FORMAT", "MOVEQUOTE_LOG_FORMAT"],
            overridden: false,
        },
    ]
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("movequote.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/movequote.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &FieldSpec,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if field.overridden {
        return "override".to_string();
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
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
