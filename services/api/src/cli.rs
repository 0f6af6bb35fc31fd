use crate::redact::{run_redact, RedactArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rent_management::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Rent Management API",
    about = "Run the rent management HTTP API and its maintenance tools",
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
    /// Print a JSON document reduced to the fields a shape template allows
    Redact(RedactArgs),
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
        Command::Redact(args) => run_redact(args),
    }
}
