use crate::demo::{run_demo, run_transition_listing, DemoArgs, TransitionArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use society_desk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Society Desk",
    about = "Run and demonstrate the society maintenance-ticket service from the command line",
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
    /// Print the role-gated status transition table
    Transitions(TransitionArgs),
    /// Walk a sample ticket through its lifecycle against the in-memory store
    Demo(DemoArgs),
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
        Command::Transitions(args) => run_transition_listing(args),
        Command::Demo(args) => run_demo(args),
    }
}
