// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! digitalhub control CLI
//!
//! Usage:
//!   dhub-ctl [--project <name>] <command> [options]
//!
//! Commands:
//!   build <run_id>                Build the run spec
//!   run <run_id> [--wait]         Execute a built run
//!   wait <run_id>                 Wait for a run to finish
//!   status <run_id>
//!   logs <run_id>
//!   stop <run_id>
//!   resume <run_id>
//!   list-runs [--kind <kind>] [--state <state>]
//!   delete-run <run_id>
//!   kinds                         List available runtimes

use std::process::ExitCode;
use std::time::Duration;

use digitalhub_sdk::{Context, ListParams, Run, RunKind, SdkConfig, State};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!(
        r#"Usage: dhub-ctl [--project <name>] <command> [options]

Control digitalhub runs.

COMMANDS:
    build <run_id>                  Build the run spec through its runtime
    run <run_id>                    Execute a built run
    wait <run_id>                   Wait until the run stops, fails or completes
    status <run_id>                 Print the run
    logs <run_id>                   Print the engine logs of a run
    stop <run_id>                   Ask the engine to stop a run
    resume <run_id>                 Ask the engine to resume a stopped run
    list-runs                       List runs of the project
    delete-run <run_id>             Delete a run
    kinds                           List run kinds with a registered runtime

GLOBAL OPTIONS:
    --project <name>                Project (default: $DHUB_PROJECT)

RUN OPTIONS:
    --wait                          Wait for the run to finish

WAIT OPTIONS:
    --poll <ms>                     Poll interval in ms (default: $DHUB_WAIT_POLL_INTERVAL_MS or 5000)
    --timeout <ms>                  Give up after this many ms (default: $DHUB_WAIT_TIMEOUT_MS or none)

LIST OPTIONS:
    --kind <kind>                   Filter by run kind
    --state <state>                 Filter by state

ENVIRONMENT:
    DHCORE_ENDPOINT                 Backend URL (default: http://localhost:8080)
    DHCORE_REQUEST_TIMEOUT_MS       Request timeout (default: 30000)
    DHUB_PROJECT                    Default project
    RUST_LOG                        Log filter (default: info)

EXAMPLES:
    # Build and run, then wait for completion
    dhub-ctl --project demo build 6f1c...
    dhub-ctl --project demo run 6f1c... --wait

    # Failed runs of a project
    dhub-ctl --project demo list-runs --state ERROR
"#
    );
}

#[derive(Debug, PartialEq)]
enum Command {
    Build { run_id: String },
    Run { run_id: String, wait: bool },
    Wait {
        run_id: String,
        poll_ms: Option<u64>,
        timeout_ms: Option<u64>,
    },
    Status { run_id: String },
    Logs { run_id: String },
    Stop { run_id: String },
    Resume { run_id: String },
    ListRuns {
        kind: Option<String>,
        state: Option<String>,
    },
    DeleteRun { run_id: String },
    Kinds,
}

#[derive(Debug)]
struct Invocation {
    project: Option<String>,
    command: Command,
}

fn parse_args() -> Result<Invocation, String> {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from_vec(&args)
}

/// Remove `--project <name>` wherever it appears.
fn take_project(args: &[String]) -> Result<(Option<String>, Vec<String>), String> {
    let mut project = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--project" {
            i += 1;
            project = Some(args.get(i).ok_or("--project requires a name")?.clone());
        } else {
            rest.push(args[i].clone());
        }
        i += 1;
    }
    Ok((project, rest))
}

fn parse_millis(value: Option<&String>, flag: &str) -> Result<u64, String> {
    value
        .ok_or(format!("{} requires a number", flag))?
        .parse()
        .map_err(|_| format!("Invalid {} value", flag))
}

fn parse_args_from_vec(args: &[String]) -> Result<Invocation, String> {
    let (project, args) = take_project(args)?;
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }
    let run_id = || -> Result<String, String> {
        Ok(args.get(2).ok_or("Run ID required")?.clone())
    };

    let command = match args[1].as_str() {
        "help" | "--help" | "-h" => {
            print_usage();
            std::process::exit(0);
        }
        "build" => Command::Build { run_id: run_id()? },
        "run" => {
            let run_id = run_id()?;
            let mut wait = false;
            for arg in &args[3..] {
                match arg.as_str() {
                    "--wait" => wait = true,
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
            }
            Command::Run { run_id, wait }
        }
        "wait" => {
            let run_id = run_id()?;
            let mut poll_ms = None;
            let mut timeout_ms = None;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--poll" => {
                        i += 1;
                        poll_ms = Some(parse_millis(args.get(i), "--poll")?);
                    }
                    "--timeout" => {
                        i += 1;
                        timeout_ms = Some(parse_millis(args.get(i), "--timeout")?);
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Command::Wait {
                run_id,
                poll_ms,
                timeout_ms,
            }
        }
        "status" => Command::Status { run_id: run_id()? },
        "logs" => Command::Logs { run_id: run_id()? },
        "stop" => Command::Stop { run_id: run_id()? },
        "resume" => Command::Resume { run_id: run_id()? },
        "list-runs" => {
            let mut kind = None;
            let mut state = None;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--kind" => {
                        i += 1;
                        let value = args.get(i).ok_or("--kind requires a value")?;
                        value.parse::<RunKind>().map_err(|e| e.to_string())?;
                        kind = Some(value.clone());
                    }
                    "--state" => {
                        i += 1;
                        let value = args.get(i).ok_or("--state requires a value")?;
                        value.parse::<State>().map_err(|e| e.to_string())?;
                        state = Some(value.clone());
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Command::ListRuns { kind, state }
        }
        "delete-run" => Command::DeleteRun { run_id: run_id()? },
        "kinds" => Command::Kinds,
        cmd => return Err(format!("Unknown command: {}", cmd)),
    };

    Ok(Invocation { project, command })
}

/// Runs must outlive a single invocation, so the in-memory store is refused.
fn require_backend(config: SdkConfig) -> Result<SdkConfig, String> {
    if config.local {
        return Err(
            "DHUB_LOCAL=true is not supported: dhub-ctl needs a backend to find runs across invocations"
                .to_string(),
        );
    }
    Ok(config)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let invocation = match parse_args() {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    if invocation.command == Command::Kinds {
        print_kinds();
        return ExitCode::SUCCESS;
    }

    let project = match invocation
        .project
        .or_else(|| std::env::var("DHUB_PROJECT").ok())
    {
        Some(project) => project,
        None => {
            eprintln!("Error: no project (use --project or set DHUB_PROJECT)");
            return ExitCode::FAILURE;
        }
    };

    let mut config = match SdkConfig::from_env()
        .map_err(|e| e.to_string())
        .and_then(require_backend)
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Command::Wait {
        poll_ms: Some(ms), ..
    } = &invocation.command
    {
        config = config.with_wait_poll_interval(Duration::from_millis(*ms));
    }

    let ctx = match Context::from_config(project, config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Failed to create context: {}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!(?ctx, "Context ready");

    match execute_command(&ctx, invocation.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_kinds() {
    let registered = digitalhub_runtimes::registered_kinds();
    for kind in RunKind::ALL {
        if registered.contains(&kind.runtime()) {
            println!("{}\t{}", kind, kind.task_kinds().join(","));
        }
    }
}

fn print_run(run: &Run) -> Result<(), String> {
    let value = run.to_value().map_err(|e| e.to_string())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?
    );
    Ok(())
}

async fn execute_command(ctx: &Context, cmd: Command) -> Result<(), String> {
    match cmd {
        Command::Build { run_id } => {
            let mut run = ctx.get_run(&run_id).await.map_err(|e| e.to_string())?;
            run.build().await.map_err(|e| e.to_string())?;
            println!("{}", run.state());
        }

        Command::Run { run_id, wait } => {
            let mut run = ctx.get_run(&run_id).await.map_err(|e| e.to_string())?;
            run.run().await.map_err(|e| e.to_string())?;
            if wait {
                run.wait(true).await.map_err(|e| e.to_string())?;
            }
            println!("{}", run.state());
        }

        Command::Wait {
            run_id, timeout_ms, ..
        } => {
            let mut run = ctx.get_run(&run_id).await.map_err(|e| e.to_string())?;
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .or(ctx.config().wait_timeout);
            run.wait_with_timeout(true, timeout)
                .await
                .map_err(|e| e.to_string())?;
            print_run(&run)?;
            if run.state() != State::Completed {
                return Err(format!("run {} ended in {}", run.id, run.state()));
            }
        }

        Command::Status { run_id } => {
            let run = ctx.get_run(&run_id).await.map_err(|e| e.to_string())?;
            print_run(&run)?;
        }

        Command::Logs { run_id } => {
            let run = ctx.get_run(&run_id).await.map_err(|e| e.to_string())?;
            let logs = run.logs().await.map_err(|e| e.to_string())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&logs).map_err(|e| e.to_string())?
            );
        }

        Command::Stop { run_id } => {
            let run = ctx.get_run(&run_id).await.map_err(|e| e.to_string())?;
            run.stop().await.map_err(|e| e.to_string())?;
            println!("Stop requested for {}", run_id);
        }

        Command::Resume { run_id } => {
            let run = ctx.get_run(&run_id).await.map_err(|e| e.to_string())?;
            run.resume().await.map_err(|e| e.to_string())?;
            println!("Resume requested for {}", run_id);
        }

        Command::ListRuns { kind, state } => {
            let mut params = ListParams::new();
            if let Some(kind) = kind {
                params = params.with("kind", kind);
            }
            if let Some(state) = state {
                params = params.with("state", state);
            }
            let runs = ctx.list_runs(&params).await.map_err(|e| e.to_string())?;
            for run in &runs {
                println!("{}\t{}\t{}\t{}", run.id, run.kind, run.state(), run.spec.task);
            }
        }

        Command::DeleteRun { run_id } => {
            ctx.delete_run(&run_id).await.map_err(|e| e.to_string())?;
            println!("Deleted {}", run_id);
        }

        Command::Kinds => print_kinds(),
    }

    Ok(())
}
