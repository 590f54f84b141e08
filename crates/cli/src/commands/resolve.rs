use movequote_core::config::LoadOptions;
use movequote_core::errors::{ApplicationError, InputError};
use movequote_core::resolver::{DeterministicInventoryResolver, InventoryResolver, ItemTally};

use super::{correlation_id, load_config, load_data, CommandResult};

const COMMAND: &str = "resolve";

/// Resolves a `label:qty, ...` listing against the catalog without pricing it.
pub fn run(options: &LoadOptions, listing: &str) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let correlation_id = correlation_id();

    let tally = match parse_tally(listing) {
        Ok(tally) => tally,
        Err(error) => return CommandResult::from_application_error(COMMAND, error, &correlation_id),
    };
    let data = match load_data(COMMAND, &config, &correlation_id) {
        Ok(data) => data,
        Err(result) => return result,
    };

    let options = config.resolver.resolver_options();
    match DeterministicInventoryResolver.resolve(&tally, &data.index, &options) {
        Ok(resolution) => {
            let message = format!("resolved {} line(s)", resolution.lines.len());
            CommandResult::success_with(COMMAND, message, &resolution)
        }
        Err(error) => {
            CommandResult::from_application_error(COMMAND, error.into(), &correlation_id)
        }
    }
}

fn parse_tally(listing: &str) -> Result<ItemTally, ApplicationError> {
    let tally = ItemTally::parse_listing(listing)?;
    if tally.is_empty() {
        return Err(InputError::NoItems.into());
    }
    Ok(tally)
}
