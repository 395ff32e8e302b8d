use std::process::ExitCode;

use clap::Parser;
use sortable::Instance;
use tracing_subscriber::EnvFilter;

mod backend;
mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use output::OutputFormat;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so table and JSON output stay clean on stdout.
    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("sortable=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let backend = backend::create_backend(&cli.backend_config).await?;
    let instance = Instance::open(backend).await?;

    let result = match &cli.command {
        Commands::List(args) => commands::list::run(&instance, args, format).await,
        Commands::Add(args) => commands::edit::add(&instance, args, format).await,
        Commands::Move(args) => commands::edit::move_record(&instance, args, format).await,
        Commands::Swap(args) => commands::edit::swap(&instance, args, format).await,
        Commands::Delete(args) => commands::edit::delete(&instance, args, format).await,
        Commands::Restore(args) => commands::edit::restore(&instance, args, format).await,
        Commands::Check(args) => commands::check::run(&instance, args, format).await,
        Commands::Collections => commands::collections::run(&instance, format).await,
    };

    // Failed operations change nothing, so the file is written either way.
    backend::persist(&instance, &cli.backend_config).await?;
    result
}
