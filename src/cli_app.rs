//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use storage_console_sim::adapter::{Simulator, TransportError};
use storage_console_sim::core::config::SimConfig;
use storage_console_sim::core::errors::SimError;
use storage_console_sim::router::dispatch::{SimRequest, SimResponse};

/// Storage console simulator: drive the offline management API from a shell.
#[derive(Debug, Parser)]
#[command(
    name = "scsim",
    author,
    version,
    about = "Storage Console Simulator - offline management API",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Fix the telemetry RNG seed.
    #[arg(long, global = true, value_name = "N")]
    seed: Option<u64>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Dispatch one request against a fresh simulator.
    Call(CallArgs),
    /// Run a JSONL file of requests against one simulator.
    Replay(ReplayArgs),
    /// Print the route table in match order.
    Routes,
    /// Print the baseline fixture.
    Baseline,
    /// Print the effective configuration and its hash.
    Config,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct CallArgs {
    /// HTTP method (GET, POST, DELETE, ...).
    method: String,
    /// Path or absolute URL, with optional query string.
    url: String,
    /// JSON request body.
    #[arg(long, value_name = "JSON")]
    body: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// File with one `{method, url, body?}` object per line.
    file: PathBuf,
    /// Stop at the first rejected request.
    #[arg(long)]
    stop_on_error: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Simulator could not be built.
    #[error("{0}")]
    Simulator(#[from] SimError),
    /// Some replayed requests were rejected.
    #[error("{0}")]
    Partial(String),
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Simulator(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Call(args) => run_call(cli, args),
        Command::Replay(args) => run_replay(cli, args),
        Command::Routes => run_routes(cli),
        Command::Baseline => run_baseline(cli),
        Command::Config => run_config(cli),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<SimConfig, CliError> {
    let mut config = SimConfig::load(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.simulator.seed = Some(seed);
    }
    Ok(config)
}

fn build_simulator(cli: &Cli) -> Result<Simulator, CliError> {
    Ok(Simulator::new(load_config(cli)?)?)
}

// ──────────────────────── call / replay ────────────────────────

fn run_call(cli: &Cli, args: &CallArgs) -> Result<(), CliError> {
    let body = args
        .body
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|e| CliError::User(format!("--body is not valid JSON: {e}")))?;
    let request = SimRequest {
        method: args.method.to_ascii_uppercase(),
        url: args.url.clone(),
        body,
    };
    let sim = build_simulator(cli)?;
    let result = sim.dispatch(&request);
    emit_result(output_mode(cli), &request, &result)?;
    match result {
        Ok(_) => Ok(()),
        Err(err) => Err(CliError::User(format!(
            "request rejected with HTTP {}",
            err.status
        ))),
    }
}

fn run_replay(cli: &Cli, args: &ReplayArgs) -> Result<(), CliError> {
    let raw = fs::read_to_string(&args.file)
        .map_err(|e| CliError::User(format!("cannot read {}: {e}", args.file.display())))?;
    let sim = build_simulator(cli)?;
    let mode = output_mode(cli);

    let mut sent = 0_usize;
    let mut rejected = 0_usize;
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let request: SimRequest = serde_json::from_str(line).map_err(|e| {
            CliError::User(format!("{}:{}: invalid request: {e}", args.file.display(), index + 1))
        })?;
        let result = sim.dispatch(&request);
        emit_result(mode, &request, &result)?;
        sent += 1;
        if result.is_err() {
            rejected += 1;
            if args.stop_on_error {
                return Err(CliError::User(format!(
                    "stopped at line {} after a rejected request",
                    index + 1
                )));
            }
        }
    }

    if mode == OutputMode::Human {
        println!("{sent} request(s), {rejected} rejected");
    }
    if rejected > 0 {
        return Err(CliError::Partial(format!(
            "{rejected} of {sent} request(s) rejected"
        )));
    }
    Ok(())
}

fn emit_result(
    mode: OutputMode,
    request: &SimRequest,
    result: &Result<SimResponse, TransportError>,
) -> Result<(), CliError> {
    match mode {
        OutputMode::Json => {
            let payload = match result {
                Ok(response) => json!({
                    "request": request,
                    "ok": true,
                    "response": response,
                }),
                Err(err) => json!({
                    "request": request,
                    "ok": false,
                    "error": {
                        "status": err.status,
                        "message": err.message,
                        "body": err.body,
                    },
                }),
            };
            write_json_line(&payload)
        }
        OutputMode::Human => {
            let target = format!("{} {}", request.method, request.url);
            let (status_line, body) = match result {
                Ok(response) => {
                    let route = response
                        .headers
                        .get("x-scsim-route")
                        .map_or("", String::as_str);
                    (
                        format!("{} {}", response.status, response.status_text)
                            .green()
                            .bold()
                            .to_string()
                            + &format!("  [{route}]").dimmed().to_string(),
                        &response.body,
                    )
                }
                Err(err) => (
                    format!("{} {}", err.status, err.message).red().bold().to_string(),
                    &err.body,
                ),
            };
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{} {status_line}", target.bold())?;
            writeln!(stdout, "{}", serde_json::to_string_pretty(body)?)?;
            Ok(())
        }
    }
}

// ──────────────────────── introspection ────────────────────────

fn run_routes(cli: &Cli) -> Result<(), CliError> {
    let sim = build_simulator(cli)?;
    let routes = sim.routes();
    match output_mode(cli) {
        OutputMode::Json => write_json_line(&json!({ "routes": routes })),
        OutputMode::Human => {
            for route in routes {
                println!(
                    "{:<7} {:<38} {}",
                    route.method.cyan(),
                    route.template,
                    route.name.dimmed()
                );
            }
            Ok(())
        }
    }
}

fn run_baseline(cli: &Cli) -> Result<(), CliError> {
    let sim = build_simulator(cli)?;
    let baseline = serde_json::to_value(sim.store().baseline())?;
    match output_mode(cli) {
        OutputMode::Json => write_json_line(&baseline),
        OutputMode::Human => {
            println!("{}", serde_json::to_string_pretty(&baseline)?);
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    config_file: String,
    hash: String,
    config: &'a SimConfig,
}

fn run_config(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let report = ConfigReport {
        config_file: config.simulator.config_file.display().to_string(),
        hash: config.stable_hash()?,
        config: &config,
    };
    match output_mode(cli) {
        OutputMode::Json => write_json_line(&serde_json::to_value(&report)?),
        OutputMode::Human => {
            println!("{} {}", "config file:".bold(), report.config_file);
            println!("{} {}", "hash:".bold(), report.hash);
            println!("{}", toml::to_string_pretty(&config).map_err(|e| {
                CliError::User(format!("cannot render config as TOML: {e}"))
            })?);
            Ok(())
        }
    }
}

// ──────────────────────── output plumbing ────────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SCSIM_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
