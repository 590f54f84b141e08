use movequote_core::config::LoadOptions;
use movequote_core::estimate::Estimator;
use movequote_core::request::QuickQuoteRequest;
use tracing::info;

use super::estimate::read_request;
use super::{correlation_id, load_config, load_data, CommandResult, EXIT_INPUT};

const COMMAND: &str = "quick-quote";

/// Weight-only quote from a request file, or from stdin when the source is `-`.
pub fn run(options: &LoadOptions, source: &str) -> CommandResult {
    match read_request(source) {
        Ok(body) => run_with_body(options, &body),
        Err(error) => {
            CommandResult::failure(COMMAND, "input_validation", format!("{error:#}"), EXIT_INPUT)
        }
    }
}

pub fn run_with_body(options: &LoadOptions, body: &str) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let correlation_id = correlation_id();

    let request = match QuickQuoteRequest::from_json(body) {
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
    match estimator.quick_quote(&request, &correlation_id) {
        Ok(quote) => {
            info!(
                event_name = "cli.quick_quote.completed",
                correlation_id = %correlation_id,
                quote_id = %quote.quote_id,
                "quick-quote command completed"
            );
            CommandResult::success_with(COMMAND, "quick quote computed", &quote)
        }
        Err(error) => CommandResult::from_application_error(COMMAND, error, &correlation_id),
    }
}
