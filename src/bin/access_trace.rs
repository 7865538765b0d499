//! 信道接入轨迹
//!
//! 重放一个 JSON 场景并打印协调器发出的每条通知

use clap::Parser;
use dcfsim_rs::mac::Notification;
use dcfsim_rs::scenario::{ScenarioSpec, run_scenario};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "access-trace",
    about = "Replay a channel access scenario and print the notification trace"
)]
struct Args {
    /// Path to scenario.json
    #[arg(long)]
    scenario: PathBuf,

    /// Write the trace as JSON to this file
    #[arg(long)]
    trace_json: Option<PathBuf>,

    /// Run until this time (us); overrides `until_us` in the scenario
    #[arg(long)]
    until_us: Option<u64>,

    /// Only validate the scenario, do not run it
    #[arg(long)]
    check: bool,
}

fn kind_label(kind: Notification) -> &'static str {
    match kind {
        Notification::AccessGranted => "grant",
        Notification::InternalCollision => "internal_collision",
        Notification::Collision => "collision",
        Notification::ChannelSwitching => "channel_switching",
        Notification::Sleep => "sleep",
        Notification::WakeUp => "wake_up",
    }
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut spec = match ScenarioSpec::load(&args.scenario) {
        Ok(spec) => spec,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(until) = args.until_us {
        spec.until_us = Some(until);
    }

    if args.check {
        return match spec.validate() {
            Ok(()) => {
                println!("ok txops={} events={}", spec.txops.len(), spec.events.len());
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        };
    }

    let outcome = match run_scenario(&spec) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    for r in &outcome.records {
        println!(
            "{} t_us={} txop={}",
            kind_label(r.kind),
            r.t_ns as f64 / 1_000.0,
            r.txop
        );
    }
    println!(
        "done @ {:?}, grants={}, internal_collisions={}, collisions={}, channel_switches={}",
        outcome.end,
        outcome.stats.grants,
        outcome.stats.internal_collisions,
        outcome.stats.collisions,
        outcome.stats.channel_switches
    );

    if let Some(path) = args.trace_json {
        let file = outcome.to_trace_file(spec.name.clone());
        let json = match serde_json::to_string_pretty(&file) {
            Ok(json) => json,
            Err(err) => {
                eprintln!("error: failed to encode trace: {err}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = fs::write(&path, json) {
            eprintln!("error: failed to write {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
