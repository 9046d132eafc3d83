pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "wardline",
    about = "Wardline operator CLI",
    long_about = "Operate Wardline migrations, readiness checks, approval workflows, and duty rosters.",
    after_help = "Examples:\n  wardline doctor --json\n  wardline submit --requester n-100 --approver n-200:Head\\ Nurse\n  wardline plan --file plan.toml"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load deterministic demo fixtures for local development")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, database connectivity, and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Create an approval document with an ordered approver chain")]
    Submit {
        #[arg(long, help = "Staff id of the requester")]
        requester: String,
        #[arg(
            long = "approver",
            required = true,
            help = "Gating approver as `staff_id` or `staff_id:Name`, in chain order (repeatable)"
        )]
        approvers: Vec<String>,
        #[arg(long = "cc", help = "Cc recipient as `staff_id` or `staff_id:Name` (repeatable)")]
        ccs: Vec<String>,
    },
    #[command(about = "Show an approval document and its derived status")]
    Status {
        #[arg(long = "document", help = "Document id")]
        document_id: String,
    },
    #[command(about = "Approve the given line on a document")]
    Approve {
        #[arg(long = "document", help = "Document id")]
        document_id: String,
        #[arg(long = "line", help = "Line id")]
        line_id: String,
    },
    #[command(about = "Reject the given line on a document, freezing the chain")]
    Reject {
        #[arg(long = "document", help = "Document id")]
        document_id: String,
        #[arg(long = "line", help = "Line id")]
        line_id: String,
        #[arg(long, help = "Reason recorded on the rejected line")]
        reason: String,
    },
    #[command(about = "Mark a cc line as read")]
    MarkRead {
        #[arg(long = "document", help = "Document id")]
        document_id: String,
        #[arg(long = "line", help = "Line id")]
        line_id: String,
    },
    #[command(about = "Create a single duty assignment")]
    Assign {
        #[arg(long, help = "Assignment date, YYYY-MM-DD")]
        date: String,
        #[arg(long = "staff", help = "Staff id")]
        staff_id: String,
        #[arg(long, help = "Staff display name (defaults to the staff id)")]
        name: Option<String>,
        #[arg(long, default_value = "general", help = "Department label")]
        dept: String,
        #[arg(long, help = "Shift kind: day or night")]
        shift: String,
    },
    #[command(about = "Submit a round-robin bulk duty plan from a TOML file")]
    Plan {
        #[arg(long, help = "Path to the plan file")]
        file: PathBuf,
    },
    #[command(about = "List duty assignments in a date range")]
    Roster {
        #[arg(long, help = "Range start, YYYY-MM-DD")]
        from: String,
        #[arg(long, help = "Range end, YYYY-MM-DD")]
        to: String,
    },
    #[command(about = "List approved leaves, optionally limited to a date range")]
    Leaves {
        #[arg(long, help = "Range start, YYYY-MM-DD", requires = "to")]
        from: Option<String>,
        #[arg(long, help = "Range end, YYYY-MM-DD", requires = "from")]
        to: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Submit { requester, approvers, ccs } => {
            commands::approvals::submit(&requester, &approvers, &ccs)
        }
        Command::Status { document_id } => commands::approvals::status(&document_id),
        Command::Approve { document_id, line_id } => commands::approvals::act(
            &document_id,
            &line_id,
            wardline_core::approvals::Action::Approve,
        ),
        Command::Reject { document_id, line_id, reason } => commands::approvals::act(
            &document_id,
            &line_id,
            wardline_core::approvals::Action::Reject { reason },
        ),
        Command::MarkRead { document_id, line_id } => commands::approvals::act(
            &document_id,
            &line_id,
            wardline_core::approvals::Action::MarkRead,
        ),
        Command::Assign { date, staff_id, name, dept, shift } => {
            commands::roster::assign(&date, &staff_id, name.as_deref(), &dept, &shift)
        }
        Command::Plan { file } => commands::roster::plan(&file),
        Command::Roster { from, to } => commands::roster::list(&from, &to),
        Command::Leaves { from, to } => {
            commands::roster::leaves(from.as_deref(), to.as_deref())
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
