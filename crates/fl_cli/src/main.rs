// crates/fl_cli/src/main.rs
//
// FORKLINE v0 — CLI entrypoint.
// Strictly offline & deterministic: the store is a local file, comparison is
// a pure function over what it holds.
//
// Exit codes: 0 = exact match, 1 = divergence, 2 = operational failure.

mod args;

use args::{parse_and_validate, Cli, Command, DiffArgs, ListArgs, RecordArgs, ShowArgs};
use fl_algo::redact::RedactionMode;
use fl_core::{Run, RunStatus, Value};
use fl_pipeline::{find_first_divergence, CompareConfig, DivergenceStatus, Show};
use fl_report::{render_json, render_text};
use fl_store::{RecordOptions, Recorder, RunStore};
use serde::Deserialize;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match parse_and_validate() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("forkline: error: {e}");
            return ExitCode::from(2);
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("forkline: error: {e}");
            ExitCode::from(2)
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Diff(d) => cmd_diff(d),
        Command::List(l) => cmd_list(l),
        Command::Show(s) => cmd_show(s),
        Command::Record(r) => cmd_record(r),
    }
}

/* --------------------------------- diff --------------------------------- */

fn cmd_diff(d: DiffArgs) -> CliResult<ExitCode> {
    let store = RunStore::open(&d.db)?;
    let run_a = store.load_run(&d.run_a)?;
    let run_b = store.load_run(&d.run_b)?;

    let cfg = CompareConfig {
        window: d.window,
        context: d.context,
        show: d.show.parse::<Show>()?,
    };
    let result = find_first_divergence(&run_a, &run_b, &cfg)?;

    match d.format.as_str() {
        "json" => println!("{}", render_json(&result)),
        _ => print!("{}", render_text(&result)),
    }

    Ok(if result.status == DivergenceStatus::ExactMatch {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/* --------------------------------- list --------------------------------- */

fn cmd_list(l: ListArgs) -> CliResult<ExitCode> {
    let rows = RunStore::open(&l.db)?.list_runs()?;
    match l.format.as_str() {
        "json" => println!("{}", serde_json::to_string(&rows)?),
        _ => {
            for r in rows {
                println!(
                    "{}  {}  {}  {} step(s)  {}",
                    r.run_id, r.entrypoint, r.status, r.step_count, r.started_at
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/* --------------------------------- show --------------------------------- */

fn cmd_show(s: ShowArgs) -> CliResult<ExitCode> {
    let run = RunStore::open(&s.db)?.load_run(&s.run_id)?;
    match s.format.as_str() {
        "json" => println!("{}", serde_json::to_string(&run)?),
        _ => print_run(&run),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_run(run: &Run) {
    println!("run: {}", run.run_id);
    println!("entrypoint: {}", run.entrypoint);
    println!("schema: {}", run.schema_version);
    println!("status: {}", run.status);
    for step in &run.steps {
        println!("[{}] {} ({} event(s))", step.idx, step.name, step.events.len());
        for ev in &step.events {
            let payload =
                serde_json::to_string(&ev.payload).unwrap_or_else(|_| "<unprintable>".to_string());
            println!("    {}: {}", ev.event_type, payload);
        }
    }
}

/* -------------------------------- record -------------------------------- */

/// One line of an event script.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptLine {
    Step {
        step: String,
    },
    Event {
        #[serde(rename = "type")]
        event_type: String,
        payload: Option<Value>,
    },
}

fn cmd_record(r: RecordArgs) -> CliResult<ExitCode> {
    let mode = match r.mode.as_str() {
        "debug" => RedactionMode::Debug,
        _ => RedactionMode::Safe,
    };
    let mut recorder = Recorder::open(
        &r.db,
        RecordOptions {
            mode,
            allow_raw: r.allow_raw,
        },
    )?;

    let script = fs::read_to_string(&r.events)?;
    let run_id = recorder.start_run(&r.entrypoint, Value::Null)?;

    for line in script.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<ScriptLine>(line)? {
            ScriptLine::Step { step } => {
                recorder.start_step(&run_id, &step)?;
            }
            ScriptLine::Event {
                event_type,
                payload,
            } => {
                recorder.log_event(&run_id, &event_type, &payload.unwrap_or(Value::Null))?;
            }
        }
    }

    let status: RunStatus = r.status.parse()?;
    recorder.end_run(&run_id, status)?;

    println!("{run_id}");
    Ok(ExitCode::SUCCESS)
}
