use crate::demo::{run_demo, run_expense_report, DemoArgs, ExpenseReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use staffdesk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "StaffDesk",
    about = "Run and demonstrate the StaffDesk HR and operations service from the command line",
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
    /// Work with expense exports
    Expenses {
        #[command(subcommand)]
        command: ExpensesCommand,
    },
    /// Seed a demo tenant and walk through every module
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ExpensesCommand {
    /// Import an expense CSV and print the filtered list with totals
    Report(ExpenseReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed a demo tenant before serving (company id defaults to "demo")
    #[arg(long, num_args = 0..=1, default_missing_value = "demo")]
    pub(crate) seed_demo: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Expenses {
            command: ExpensesCommand::Report(args),
        } => run_expense_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
