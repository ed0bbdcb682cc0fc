use crate::batch::{run_batch, summarize_report, BatchRunArgs, BatchSummaryArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scorify::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "scorify",
    about = "Score customer/campaign leads in idempotent batches",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and batch scheduler (default command)
    Serve(ServeArgs),
    /// Run or inspect scoring batches without the HTTP service
    Batch {
        #[command(subcommand)]
        command: BatchCommand,
    },
}

#[derive(Subcommand, Debug)]
enum BatchCommand {
    /// Score every unscored pair in a seed dataset once
    Run(BatchRunArgs),
    /// Count yes/no labels in a report written by `batch run --output`
    Summary(BatchSummaryArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Skip the scheduled run at startup
    #[arg(long)]
    pub(crate) no_startup_run: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Batch {
            command: BatchCommand::Run(args),
        } => tokio::task::spawn_blocking(move || run_batch(args))
            .await
            .map_err(|err| AppError::Batch(format!("batch task aborted: {err}")))?,
        Command::Batch {
            command: BatchCommand::Summary(args),
        } => summarize_report(args),
    }
}
