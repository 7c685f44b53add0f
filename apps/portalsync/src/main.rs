use std::{path::PathBuf, process::ExitCode};

use clap::{ArgAction, Args, Parser, Subcommand};
use client_core::{report::Period, PortalError};
use shared::{
    domain::{BenefitType, PortalStatus, RegistrationType, TerminationReason, WageType},
    error::ApiError,
};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(name = "portalsync", about = "Track SSF and AIA benefit registrations per worksite")]
struct Cli {
    /// Config file, `portalsync.toml` in the working directory by default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Headcount, sync rate and provider queues.
    Dashboard,
    /// List employees.
    Employees {
        #[arg(long)]
        worksite: Option<String>,
        /// `in` or `out`.
        #[arg(long)]
        tab: Option<RegistrationType>,
        #[arg(long)]
        search: Option<String>,
        /// Include exited employees.
        #[arg(long)]
        all: bool,
    },
    /// Register a new hire.
    RegisterIn(RegisterInArgs),
    /// Process an employee exit.
    RegisterOut {
        #[arg(long)]
        employee: String,
        #[arg(long)]
        exit_date: String,
        /// Position in the reason list (1-6) or its label.
        #[arg(long)]
        reason: TerminationReason,
        #[arg(long)]
        worksite: Option<String>,
        #[arg(long)]
        benefit: Option<BenefitType>,
    },
    /// Move a registration along the portal pipeline.
    SetStatus {
        #[arg(long)]
        employee: String,
        #[arg(long)]
        status: PortalStatus,
        /// Refuse to move back to an earlier step.
        #[arg(long)]
        forward_only: bool,
    },
    /// Per-provider sync queue.
    Tracker {
        #[arg(long, default_value = "ssf")]
        benefit: BenefitType,
        #[arg(long, default_value = "in")]
        tab: RegistrationType,
    },
    /// Audit report, optionally exported as CSV.
    Report {
        #[arg(long, default_value = "in")]
        tab: RegistrationType,
        #[arg(long)]
        site: Option<String>,
        #[arg(long)]
        provider: Option<BenefitType>,
        /// `All` or `YYYY-MM`.
        #[arg(long, default_value = "All")]
        period: Period,
        /// Directory to write the CSV file into.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Manage worksites.
    Worksites {
        #[command(subcommand)]
        action: WorksiteAction,
    },
    /// SSF hospitals grouped by province.
    Hospitals {
        /// Ask the AI reference service instead of the backend.
        #[arg(long)]
        ai: bool,
    },
    DeleteEmployee {
        #[arg(long)]
        employee: String,
    },
    /// Write a plain-text form document for an employee.
    Document {
        #[arg(long)]
        title: String,
        #[arg(long)]
        employee: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct RegisterInArgs {
    #[arg(long)]
    first: Option<String>,
    #[arg(long)]
    last: Option<String>,
    #[arg(long)]
    id_card: Option<String>,
    #[arg(long)]
    employment_date: Option<String>,
    #[arg(long)]
    worksite: Option<String>,
    #[arg(long)]
    benefit: Option<BenefitType>,
    #[arg(long)]
    hospital1: Option<String>,
    #[arg(long)]
    hospital2: Option<String>,
    #[arg(long)]
    hospital3: Option<String>,
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    date_of_birth: Option<String>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    nationality: Option<String>,
    #[arg(long)]
    marital_status: Option<String>,
    #[arg(long)]
    wage_type: Option<WageType>,
    #[arg(long)]
    effective_date: Option<String>,
    #[arg(long)]
    employee_no: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    designation: Option<String>,
    #[arg(long)]
    passport: Option<String>,
    #[arg(long)]
    salary: Option<String>,
    #[arg(long)]
    bank_name: Option<String>,
    #[arg(long)]
    bank_account: Option<String>,
    #[arg(long)]
    plan: Option<String>,
    /// JPEG of the ID card to pre-fill identity fields from.
    #[arg(long)]
    scan: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum WorksiteAction {
    List,
    Add(WorksiteArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: WorksiteArgs,
    },
    Remove {
        id: String,
    },
}

#[derive(Args, Debug, Default)]
struct WorksiteArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    icon: Option<String>,
    #[arg(long)]
    color: Option<String>,
    /// Registration window in days.
    #[arg(long)]
    hire_limit: Option<u32>,
    /// Resignation window in days.
    #[arg(long)]
    resign_limit: Option<u32>,
    #[arg(long, action = ArgAction::Set)]
    sync_ssf: Option<bool>,
    #[arg(long, action = ArgAction::Set)]
    sync_aia: Option<bool>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report_error(err: &anyhow::Error, json: bool) {
    let portal = err.downcast_ref::<PortalError>();
    if json {
        let summary = match portal {
            Some(portal) => ApiError::from(portal),
            None => ApiError::new(shared::error::ErrorCode::InvalidResponse, format!("{err:#}")),
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(_) => eprintln!("error: {err:#}"),
        }
        return;
    }

    match portal.and_then(PortalError::validation_problems) {
        Some(problems) => {
            eprintln!("error: please correct the form:");
            for problem in problems {
                eprintln!("  - {problem}");
            }
        }
        None => eprintln!("error: {err:#}"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, json);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
