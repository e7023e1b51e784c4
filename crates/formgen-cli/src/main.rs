//! Formgen CLI - scaffolding-template parameters from CRDs, XRDs and Terraform modules

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use commands::crd::CrdArgs;
use commands::tf::TfArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "formgen")]
#[command(version)]
#[command(about = "Generate template parameter forms from CRDs, XRDs and Terraform modules", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file [default: <config dir>/formgen/config.yaml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate template parameters
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// From CRD and XRD files
    Crd(CrdArgs),

    /// From Terraform module variables
    Tf(TfArgs),
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Template { command } => match command {
            TemplateCommands::Crd(args) => commands::crd::run(config, &args),
            TemplateCommands::Tf(args) => commands::tf::run(config, &args),
        },
    }
}

fn main() {
    miette::set_panic_hook();

    // Cli::parse() exits with 2 on usage errors, which is VALIDATION_ERROR here
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also arrive here
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let code = if err.print().is_ok() { code } else { exit_codes::ERROR };
            std::process::exit(code);
        }
    };

    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
