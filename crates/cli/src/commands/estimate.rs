use std::fs;
use std::io::{self, Read};

use anyhow::Context;
use movequote_core::config::LoadOptions;
use movequote_core::estimate::Estimator;
use movequote_core::request::EstimateRequest;
use tracing::info;

use super::{correlation_id, load_config, load_data, CommandResult, EXIT_INPUT};

const COMMAND: &str = "estimate";

/// Reads the request from a file path, or from stdin when the source is `-`.
pub fn run(options: &LoadOptions, source: &str, include_trace: bool) -> CommandResult {
    match read_request(source) {
        Ok(body) => run_with_body(options, &body, include_trace),
        Err(error) => {
            CommandResult::failure(COMMAND, "input_validation", format!("{error:#}"), EXIT_INPUT)
        }
    }
}

pub fn run_with_body(options: &LoadOptions, body: &str, include_trace: bool) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let correlation_id = correlation_id();

    let request = match EstimateRequest::from_json(body) {
        Ok(request) => request,
        Err(error) => {
            return CommandResult::from_application_error(COMMAND, error.into(), &correlation_id)
        }
    };
    let data = match load_data(COMMAND, &config, &correlation_id) {
        Ok(data) => data,
        Err(result) => return result,
    };

    let estimator = Estimator::new(data, config.resolver.resolver_options());
    match estimator.estimate(&request, include_trace, &correlation_id) {
        Ok(estimate) => {
            info!(
                event_name = "cli.estimate.completed",
                correlation_id = %correlation_id,
                quote_id = %estimate.quote_id,
                "estimate command completed"
            );
            CommandResult::success_with(COMMAND, "estimate computed", &estimate)
        }
        Err(error) => CommandResult::from_application_error(COMMAND, error, &correlation_id),
    }
}

/// `-` reads stdin; anything else is a file path.
pub(crate) fn read_request(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut body = String::new();
        io::stdin().read_to_string(&mut body).context("failed to read request from stdin")?;
        return Ok(body);
    }
    fs::read_to_string(source).with_context(|| format!("failed to read request file `{source}`"))
}
