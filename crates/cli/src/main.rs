mod commands;
mod context;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::context::Context;

/// Environment variable overriding the log filter.
const LOG_ENV: &str = "APPRAISAL_LOG";

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Approver decision kind for the decide subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DecisionKind {
    Approve,
    Reject,
}

/// Performance evaluation workflow client.
#[derive(Parser)]
#[command(
    name = "appraisal",
    version,
    about = "Performance evaluation workflow client"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the client TOML configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a JSON fixture as the backend instead of the REST API.
    /// Changes made by submissions are written back to the file.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List criteria groups and their items
    Criteria,

    /// Check a responses file against the criteria without submitting
    Check {
        /// Mission whose evaluation is checked
        #[arg(long)]
        mission: i64,
        /// JSON array of {item_id, value} responses
        #[arg(long)]
        responses: PathBuf,
    },

    /// Submit the employee self-assessment (step 1)
    SelfAssess {
        #[arg(long)]
        mission: i64,
        /// JSON array of {item_id, value} responses
        #[arg(long)]
        responses: PathBuf,
        /// Employee id of the evaluator
        #[arg(long)]
        evaluator: Option<i64>,
        /// Employee id of the approver
        #[arg(long)]
        approver: Option<i64>,
        /// Employee id of the person being evaluated
        #[arg(long)]
        employee: Option<i64>,
    },

    /// Submit the manager evaluation (step 2)
    Evaluate {
        #[arg(long)]
        mission: i64,
        /// JSON array of {item_id, value} responses
        #[arg(long)]
        responses: PathBuf,
    },

    /// Show the current step of an evaluation
    Status {
        #[arg(long)]
        mission: i64,
    },

    /// Issue the approver decision (step 3)
    Decide {
        #[arg(long)]
        mission: i64,
        /// approve or reject
        #[arg(value_enum)]
        decision: DecisionKind,
        /// Rejection comment (at least 10 characters)
        #[arg(long)]
        comment: Option<String>,
    },

    /// Compare employee and evaluator answers (step 3)
    Summary {
        #[arg(long)]
        mission: i64,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = match Context::new(cli.config.as_deref(), cli.fixture, cli.output, cli.quiet) {
        Ok(ctx) => ctx,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                cli.output,
                cli.quiet,
            );
            process::exit(1);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Criteria => commands::criteria::cmd_criteria(&ctx).await,
            Commands::Check { mission, responses } => {
                commands::check::cmd_check(&ctx, mission, &responses).await
            }
            Commands::SelfAssess {
                mission,
                responses,
                evaluator,
                approver,
                employee,
            } => {
                commands::submit::cmd_self_assess(
                    &ctx,
                    commands::submit::SelfAssessArgs {
                        mission,
                        responses: &responses,
                        evaluator,
                        approver,
                        employee,
                    },
                )
                .await
            }
            Commands::Evaluate { mission, responses } => {
                commands::submit::cmd_evaluate(&ctx, mission, &responses).await
            }
            Commands::Status { mission } => commands::review::cmd_status(&ctx, mission).await,
            Commands::Decide {
                mission,
                decision,
                comment,
            } => {
                let decision = match decision {
                    DecisionKind::Approve => appraisal_core::Decision::Approve,
                    DecisionKind::Reject => appraisal_core::Decision::Reject {
                        comment: comment.unwrap_or_default(),
                    },
                };
                commands::review::cmd_decide(&ctx, mission, decision).await
            }
            Commands::Summary { mission } => commands::review::cmd_summary(&ctx, mission).await,
        }
    });

    if let Err(msg) = result {
        report_error(&msg, cli.output, cli.quiet);
        process::exit(1);
    }
}

/// Install the stderr log subscriber. `APPRAISAL_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
