use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use emission_core::error::AppError;

use crate::demo::{run_demo, run_factor_import, run_factor_lookup, DemoArgs, LookupArgs};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "emission-api",
    about = "Match activity data to emission factors and calculate GHG emissions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Validate and inspect emission factor files
    Factors {
        #[command(subcommand)]
        command: FactorsCommand,
    },
    /// Run the seeded calculation scenarios end to end
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum FactorsCommand {
    /// Validate a factor CSV and report what a load would create
    Import {
        /// Path to the factor CSV
        csv: PathBuf,
    },
    /// Resolve the factor a query would use, including fallbacks
    Lookup(LookupArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Factors {
            command: FactorsCommand::Import { csv },
        } => run_factor_import(csv),
        Command::Factors {
            command: FactorsCommand::Lookup(args),
        } => run_factor_lookup(args),
        Command::Demo(args) => run_demo(args),
    }
}
