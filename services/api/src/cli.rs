use crate::report::{run_assess, run_options, AssessArgs, OptionsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use site_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Site Risk",
    about = "Predict construction-site fatality risk from the command line or over HTTP",
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
    /// Assess a single site selection and print the result
    Assess(AssessArgs),
    /// List the categories accepted for each selection
    Options(OptionsArgs),
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
        Command::Assess(args) => run_assess(args).await,
        Command::Options(args) => run_options(args).await,
    }
}
