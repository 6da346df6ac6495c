pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use menudex_core::config::{AppConfig, LogFormat};
use tracing::Level;

use crate::commands::{ask::AskArgs, CommandResult, GlobalOptions};

#[derive(Debug, Parser)]
#[command(
    name = "menudex",
    about = "Menudex catalog inspection and query CLI",
    long_about = "Normalize a menu catalog document, inspect what it contains, and answer structured questions about it.",
    after_help = "Examples:\n  menudex --dataset menu.json summary\n  menudex ask --intent price --item \"nutty bowl\" --portion small\n  echo '{\"intent\":\"discount_list\"}' | menudex query\n  menudex doctor --json"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalOptions,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Load the dataset and report entity counts, coverage and warnings")]
    Summary,
    #[command(about = "Answer one intent given as flags")]
    Ask(AskArgs),
    #[command(about = "Answer one intent given as JSON (argument or stdin)")]
    Query {
        #[arg(help = "Intent JSON, e.g. {\"intent\":\"price\",\"item\":\"latte\"}")]
        intent: Option<String>,
    },
    #[command(about = "Write items, prices, categories and discounts as CSV and JSONL")]
    Export {
        #[arg(long, help = "Output directory, created when missing")]
        out: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, dataset readability and catalog normalization")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(log_level).with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(cli.global.load_options()) {
        init_logging(&config);
    }

    let global = &cli.global;
    let result = match &cli.command {
        Command::Summary => commands::summary::run(global),
        Command::Ask(args) => commands::ask::run(global, args),
        Command::Query { intent } => commands::query::run(global, intent.as_deref()),
        Command::Export { out } => commands::export::run(global, out),
        Command::Config => CommandResult { exit_code: 0, output: commands::config::run(global) },
        Command::Doctor { json } => CommandResult { exit_code: 0, output: commands::doctor::run(global, *json) },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
