pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use movequote_core::catalog::DEFAULT_SUGGEST_LIMIT;
use movequote_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "movequote",
    about = "Movequote estimator CLI",
    long_about = "Price moving jobs from free-form inventories, inspect catalog matching, and check data readiness.",
    after_help = "Examples:\n  movequote estimate --request move.json --trace\n  movequote quick-quote --request quick.json\n  movequote resolve --items \"queen bed:1, boxes:20\"\n  movequote doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a movequote.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the catalog document path")]
    catalog: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the moving rules document path")]
    rules: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the packing rate table path (empty disables it)")]
    packing_table: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the log level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a move from a JSON request file (`-` reads stdin)")]
    Estimate {
        #[arg(long, help = "Request JSON path, or `-` for stdin")]
        request: String,
        #[arg(long, help = "Include the calculation trace in the output")]
        trace: bool,
    },
    #[command(about = "Price a move from total catalog weight only (`-` reads stdin)")]
    QuickQuote {
        #[arg(long, help = "Quick quote request JSON path, or `-` for stdin")]
        request: String,
    },
    #[command(about = "Resolve a `label:qty, ...` listing against the catalog without pricing")]
    Resolve {
        #[arg(long, help = "Comma separated `label:qty` entries")]
        items: String,
    },
    #[command(about = "Match one label to a catalog item")]
    Match {
        label: String,
        #[arg(long, help = "Minimum similarity for approximate matches")]
        threshold: Option<f64>,
    },
    #[command(about = "List the closest catalog aliases for a label")]
    Suggest {
        label: String,
        #[arg(long, default_value_t = DEFAULT_SUGGEST_LIMIT)]
        limit: usize,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, static data documents, and a sample estimate")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                catalog_path: self.catalog.clone(),
                rules_path: self.rules.clone(),
                packing_table_path: self.packing_table.clone(),
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

/// Installs the stderr subscriber. Stdout is reserved for command output.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    // Config errors are reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Estimate { request, trace } => commands::estimate::run(&options, &request, trace),
        Command::QuickQuote { request } => commands::quick::run(&options, &request),
        Command::Resolve { items } => commands::resolve::run(&options, &items),
        Command::Match { label, threshold } => {
            commands::lookup::run_match(&options, &label, threshold)
        }
        Command::Suggest { label, limit } => commands::lookup::run_suggest(&options, &label, limit),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn global_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "movequote",
            "--catalog",
            "alt/catalog.json",
            "match",
            "sofa",
        ])
        .expect("arguments should parse");

        let options = cli.load_options();
        assert!(!options.require_file);
        assert_eq!(
            options.overrides.catalog_path.as_deref(),
            Some(std::path::Path::new("alt/catalog.json"))
        );
    }

    #[test]
    fn explicit_config_file_is_required() {
        let cli = Cli::try_parse_from(["movequote", "--config", "custom.toml", "config"])
            .expect("arguments should parse");

        assert!(cli.load_options().require_file);
    }

    #[test]
    fn estimate_requires_a_request_source() {
        assert!(Cli::try_parse_from(["movequote", "estimate"]).is_err());
        assert!(Cli::try_parse_from(["movequote", "quick-quote"]).is_err());
    }

    #[test]
    fn quick_quote_is_a_kebab_case_subcommand() {
        let cli = Cli::try_parse_from(["movequote", "quick-quote", "--request", "-"])
            .expect("arguments should parse");

        assert!(matches!(cli.command, Command::QuickQuote { ref request } if request == "-"));
    }
}
