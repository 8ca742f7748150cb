use crate::demo::{run_demo, DemoArgs};
use crate::server;
use crate::submissions::{run_delete, run_list, DeleteArgs, ListArgs};
use clap::{Args, Parser, Subcommand};
use doc_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Document Intake",
    about = "Run the document submission service or inspect stored submissions",
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
    /// Review stored form submissions
    Submissions {
        #[command(subcommand)]
        command: SubmissionsCommand,
    },
    /// Walk a scripted signup, form submission, and admin review against an in-memory store
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum SubmissionsCommand {
    /// List stored submissions, optionally filtered
    List(ListArgs),
    /// Delete a stored submission by id
    Delete(DeleteArgs),
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
        Command::Submissions {
            command: SubmissionsCommand::List(args),
        } => run_list(args),
        Command::Submissions {
            command: SubmissionsCommand::Delete(args),
        } => run_delete(args),
        Command::Demo(args) => run_demo(args),
    }
}
