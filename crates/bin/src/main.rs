use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands, MarkCommand};
use output::OutputFormat;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays clean for JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("yprose=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.replica_config();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match &cli.command {
        Commands::Build(args) => commands::convert::build(args, &config),
        Commands::Serialize(args) => commands::convert::serialize(args, &config),
        Commands::Reconcile(args) => commands::convert::reconcile(args, &config, format),
        Commands::Mark(MarkCommand::Encode(args)) => commands::mark::encode(args, format),
        Commands::Mark(MarkCommand::Decode(args)) => commands::mark::decode(args, format),
    }
}
