//! bpod CLI - Command-line interface for bpod-session
//!
//! Commands:
//! - summary: Print a session overview
//! - states / events: Per-trial state duration and event occurrence tables
//! - medians: Per-group medians of either table
//! - dead-time: Gaps between consecutive trials
//! - licks: Port lick edges for one trial
//! - ports: Port numbers used during the session
//! - trial-times / trial-start: Per-trial clock times and durations

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bpod_session::analysis::{
    event_occurrence_table, median_table, port_licks, session_dead_time, state_duration_table,
    used_port_numbers,
};
use bpod_session::{
    SessionConfig, SessionError, SessionLoader, SessionModel, TimeBasis, TrialTimeKind, VERSION,
};

/// bpod - Normalize Bpod SessionData exports and derive trial statistics
#[derive(Parser)]
#[command(name = "bpod")]
#[command(version = VERSION)]
#[command(about = "Inspect Bpod SessionData exports", long_about = None)]
struct Cli {
    /// Log loader decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct InputArgs {
    /// SessionData JSON export
    #[arg(short, long)]
    input: PathBuf,

    /// Loader configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format (defaults to json-pretty on a terminal, ndjson otherwise)
    #[arg(long)]
    output_format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a session overview
    Summary {
        #[command(flatten)]
        input: InputArgs,

        /// Output the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Time spent in each visited state, per trial
    States {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Firings of every session event, per trial
    Events {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Per-group medians of a derived table
    Medians {
        #[command(flatten)]
        input: InputArgs,

        /// Table to reduce
        #[arg(long, value_enum, default_value = "states")]
        table: TableKind,

        /// Column to group by (defaults to the state/event name)
        #[arg(long)]
        group: Option<String>,
    },

    /// Gaps between consecutive trials (Gen2 sessions only)
    DeadTime {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Port lick on/off edges for one trial
    Licks {
        #[command(flatten)]
        input: InputArgs,

        /// Trial index (0-based)
        #[arg(long)]
        trial: usize,

        /// Port number
        #[arg(long)]
        port: u32,

        /// Return raw edges without boundary NaNs
        #[arg(long)]
        no_align: bool,
    },

    /// Port numbers used during the session
    Ports {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Per-trial start clock times or durations
    TrialTimes {
        #[command(flatten)]
        input: InputArgs,

        /// start or duration
        #[arg(long, default_value = "start")]
        kind: String,
    },

    /// Start time of one trial
    TrialStart {
        #[command(flatten)]
        input: InputArgs,

        /// Trial index (0-based)
        #[arg(long)]
        trial: usize,

        /// trial (offset seconds) or clock (UTC)
        #[arg(long, default_value = "trial")]
        basis: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON array of rows
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum TableKind {
    /// State duration table
    States,
    /// Event occurrence table
    Events,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BpodCliError> {
    match cli.command {
        Commands::Summary { input, json } => {
            let (session, _) = load_session(&input)?;
            let summary = session.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary);
            }
            Ok(())
        }

        Commands::States { input } => {
            let (session, _) = load_session(&input)?;
            emit(&state_duration_table(&session), &input)
        }

        Commands::Events { input } => {
            let (session, _) = load_session(&input)?;
            emit(&event_occurrence_table(&session), &input)
        }

        Commands::Medians {
            input,
            table,
            group,
        } => {
            let (session, _) = load_session(&input)?;
            let medians = match table {
                TableKind::States => median_table(
                    &state_duration_table(&session),
                    group.as_deref().unwrap_or("state"),
                    "duration",
                )?,
                TableKind::Events => median_table(
                    &event_occurrence_table(&session),
                    group.as_deref().unwrap_or("event"),
                    "occurrences",
                )?,
            };
            emit(&medians.rows, &input)
        }

        Commands::DeadTime { input } => {
            let (session, _) = load_session(&input)?;
            let gaps = session_dead_time(&session).ok_or_else(|| {
                BpodCliError::NotAvailable("dead time needs trial end offsets".to_string())
            })?;
            // NaN serializes as null
            emit(&gaps, &input)
        }

        Commands::Licks {
            input,
            trial,
            port,
            no_align,
        } => {
            let (session, config) = load_session(&input)?;
            let view = session
                .trial(trial)
                .ok_or(BpodCliError::TrialOutOfRange(trial, session.trial_count()))?;
            let licks = port_licks(view.record(), port, &config.port_event_prefix, !no_align);
            emit(&[licks], &input)
        }

        Commands::Ports { input } => {
            let (session, config) = load_session(&input)?;
            emit(
                &used_port_numbers(session.distinct_events(), &config.port_event_prefix),
                &input,
            )
        }

        Commands::TrialTimes { input, kind } => {
            let kind = kind.parse::<TrialTimeKind>()?;
            let (session, _) = load_session(&input)?;
            emit(&[session.trial_times(kind)?], &input)
        }

        Commands::TrialStart {
            input,
            trial,
            basis,
        } => {
            let basis = basis.parse::<TimeBasis>()?;
            let (session, _) = load_session(&input)?;
            let view = session
                .trial(trial)
                .ok_or(BpodCliError::TrialOutOfRange(trial, session.trial_count()))?;
            emit(&[view.start_time(basis)?], &input)
        }
    }
}

fn load_session(input: &InputArgs) -> Result<(SessionModel, SessionConfig), BpodCliError> {
    let config = match &input.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    let session = SessionLoader::new(config.clone()).load_path(Path::new(&input.input))?;
    Ok((session, config))
}

// Helper functions

fn emit<T: Serialize>(rows: &[T], input: &InputArgs) -> Result<(), BpodCliError> {
    let format = input.output_format.unwrap_or_else(|| {
        if atty::is(atty::Stream::Stdout) {
            OutputFormat::JsonPretty
        } else {
            OutputFormat::Ndjson
        }
    });
    print!("{}", format_output(rows, format)?);
    Ok(())
}

fn format_output<T: Serialize>(rows: &[T], format: OutputFormat) -> Result<String, BpodCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for row in rows {
                lines.push(serde_json::to_string(row)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(rows)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(rows)? + "\n"),
    }
}

// Error types

#[derive(Debug)]
enum BpodCliError {
    Session(SessionError),
    Json(serde_json::Error),
    TrialOutOfRange(usize, usize),
    NotAvailable(String),
}

impl From<SessionError> for BpodCliError {
    fn from(e: SessionError) -> Self {
        BpodCliError::Session(e)
    }
}

impl From<serde_json::Error> for BpodCliError {
    fn from(e: serde_json::Error) -> Self {
        BpodCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BpodCliError> for CliError {
    fn from(e: BpodCliError) -> Self {
        match e {
            BpodCliError::Session(e) => {
                let (code, hint) = match &e {
                    SessionError::FileUnreadable { .. } => {
                        ("FILE_UNREADABLE", "Check the path and that the file is a JSON export")
                    }
                    SessionError::MalformedRecord { .. } => {
                        ("MALFORMED_RECORD", "The export does not match the SessionData layout")
                    }
                    SessionError::MetadataParseError(_) => (
                        "METADATA_PARSE_ERROR",
                        "Check Info.SessionDate / Info.SessionStartTime_UTC or start_time_format",
                    ),
                    SessionError::InvalidArgument(_) => {
                        ("INVALID_ARGUMENT", "Run with --help for accepted values")
                    }
                    SessionError::Json(_) => ("JSON_ERROR", "Check JSON syntax"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            BpodCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            BpodCliError::TrialOutOfRange(trial, count) => CliError {
                code: "TRIAL_OUT_OF_RANGE".to_string(),
                message: format!("trial {} requested, session has {} trials", trial, count),
                hint: Some("Trial indices are 0-based".to_string()),
            },
            BpodCliError::NotAvailable(msg) => CliError {
                code: "NOT_AVAILABLE".to_string(),
                message: msg,
                hint: Some("Legacy sessions lack trial end offsets".to_string()),
            },
        }
    }
}
