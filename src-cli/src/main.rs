//! Assist Lens Command-Line Interface
//!
//! Drives the voice service from a terminal: start and stop listening,
//! stream what it hears, and query its state.

mod client;
mod colors;
mod commands;
mod exit_codes;

use clap::{Parser, Subcommand};
use exit_codes::ExitCode;

/// Assist Lens - voice service CLI
#[derive(Parser, Debug)]
#[command(name = "assistlens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start continuous listening
    Start,
    /// Stop listening
    Stop,
    /// Print recognized speech and errors until interrupted
    Listen,
    /// Invoke a method on the service by name
    Call {
        /// Method name, e.g. startVoiceService
        method: String,
    },
    /// Show the listening state
    Status,
    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Failed to create Tokio runtime: {}", e)));
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    };

    let exit_code = runtime.block_on(run(cli));
    std::process::exit(exit_code.as_i32());
}

async fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Commands::Start => commands::start(cli.json, cli.quiet).await,
        Commands::Stop => commands::stop(cli.json, cli.quiet).await,
        Commands::Listen => commands::listen(cli.json, cli.quiet).await,
        Commands::Call { method } => commands::call(&method, cli.json, cli.quiet).await,
        Commands::Status => commands::status(cli.json).await,
        Commands::Version => {
            commands::version(cli.json);
            ExitCode::Success
        }
    }
}
