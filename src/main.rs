use std::process::ExitCode;

use clap::Parser;
use doctree::cli::commands;
use doctree::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    doctree::logging::init_with_config(&settings.logging);

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args, settings).await,
        Commands::Add { dir, name } => commands::add::run(dir, name, &settings),
        Commands::Remove { name } => commands::remove::run(&name, &settings),
        Commands::Index { dir, name } => commands::index::run(dir, name, &settings),
        Commands::List => commands::list::run(&settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
