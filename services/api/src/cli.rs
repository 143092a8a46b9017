use crate::demo::{run_analyze, run_catalog, AnalyzeArgs, CatalogArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use vitamin_insight::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Vitamin Insight",
    about = "Generate illustrative vitamin status reports from an uploaded image",
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
    /// Analyze an image file and print the vitamin report
    Analyze(AnalyzeArgs),
    /// List the nutrient catalog with food and symptom guidance
    Catalog(CatalogArgs),
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
        Command::Analyze(args) => run_analyze(args),
        Command::Catalog(args) => run_catalog(args),
    }
}
