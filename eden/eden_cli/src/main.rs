use anyhow::Result;
use clap::{Parser, Subcommand};

mod builtin;
mod commands;

use commands::boot::{BootArgs, PromptMode};
use commands::permission::CheckPermissionArgs;
use commands::system::ValidateArgs;

/// Eden Command Line Interface
///
/// Boots an Eden extension host from a configuration file and inspects its
/// lifecycle and permission state.
#[derive(Parser)]
#[clap(name = "eden", author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot a host through every lifecycle stage
    Boot(BootArgs),

    /// List the lifecycle stages in boot order
    Stages,

    /// Show the decision a configuration yields for a permission descriptor
    #[clap(name = "check-permission")]
    CheckPermission(CheckPermissionArgs),

    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: Result<()> = match cli.command {
        Commands::Boot(args) => commands::boot::execute(args).await,
        Commands::Stages => {
            commands::system::execute_stages();
            Ok(())
        }
        Commands::CheckPermission(args) => commands::permission::execute(args).await,
        Commands::Validate(args) => commands::system::execute_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
