use movequote_core::catalog::MatchResult;
use movequote_core::config::LoadOptions;
use serde::Serialize;

use super::{correlation_id, load_config, load_data, CommandResult, EXIT_INPUT};

#[derive(Debug, Serialize)]
struct MatchReport {
    label: String,
    threshold: f64,
    #[serde(rename = "match")]
    matched: Option<MatchResult>,
}

pub fn run_match(options: &LoadOptions, label: &str, threshold: Option<f64>) -> CommandResult {
    const COMMAND: &str = "match";

    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let threshold = threshold.unwrap_or(config.resolver.match_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return CommandResult::failure(
            COMMAND,
            "input_validation",
            format!("threshold must be within 0..=1, got {threshold}"),
            EXIT_INPUT,
        );
    }
    let data = match load_data(COMMAND, &config, &correlation_id()) {
        Ok(data) => data,
        Err(result) => return result,
    };

    let matched = data.index.match_label(label, threshold);
    let message = match &matched {
        Some(result) => format!("`{label}` matched `{}`", result.item.id),
        None => format!("no catalog item matched `{label}`"),
    };
    let report = MatchReport { label: label.to_string(), threshold, matched };
    CommandResult::success_with(COMMAND, message, &report)
}

pub fn run_suggest(options: &LoadOptions, label: &str, limit: usize) -> CommandResult {
    const COMMAND: &str = "suggest";

    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let data = match load_data(COMMAND, &config, &correlation_id()) {
        Ok(data) => data,
        Err(result) => return result,
    };

    let suggestions = data.index.suggest(label, limit);
    let message = format!("{} suggestion(s) for `{label}`", suggestions.len());
    CommandResult::success_with(COMMAND, message, &suggestions)
}
