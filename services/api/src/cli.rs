use crate::commands::{run_import, run_outcome_list, run_scale_summary, ImportArgs, ScalesArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use competency_import::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Outcome Importer",
    about = "Convert legacy grading outcomes into a competency framework",
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
    /// Inspect the outcomes available for import
    Outcomes {
        #[command(subcommand)]
        command: OutcomesCommand,
    },
    /// Import selected outcomes as a new competency framework
    Import(ImportArgs),
}

#[derive(Subcommand, Debug)]
enum OutcomesCommand {
    /// List site-wide outcomes sorted by shortname
    List(CatalogArgs),
    /// Summarize the scales used by a selection of outcomes
    Scales(ScalesArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
}

/// Catalog export locations, overriding `APP_OUTCOMES_CSV` and `APP_SCALES_CSV`.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct CatalogArgs {
    /// Outcomes CSV export
    #[arg(long)]
    pub(crate) outcomes_csv: Option<PathBuf>,
    /// Scales CSV export
    #[arg(long)]
    pub(crate) scales_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Outcomes {
            command: OutcomesCommand::List(args),
        } => run_outcome_list(args),
        Command::Outcomes {
            command: OutcomesCommand::Scales(args),
        } => run_scale_summary(args),
        Command::Import(args) => run_import(args),
    }
}
