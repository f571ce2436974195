//! Headless Scenario Runner
//!
//! Plays a stealth scenario file and prints what the sensors noticed.

use std::path::PathBuf;

use clap::Parser;
use stealth_sentry::core::Result;
use stealth_sentry::scenario::{EventKind, Scenario, ScenarioRunner};

/// Headless Scenario Runner - replay a level's sensors and alarms
#[derive(Parser, Debug)]
#[command(name = "scenario_runner")]
#[command(about = "Run a stealth scenario headless and report sensing events")]
struct Args {
    /// Scenario TOML file
    #[arg(default_value = "data/scenarios/vault.toml")]
    path: PathBuf,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 10.0)]
    duration: f32,

    /// Step size in seconds
    #[arg(long, default_value_t = 0.05)]
    dt: f32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "stealth_sentry=debug"
    } else {
        "stealth_sentry=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let seed = args.seed.unwrap_or_else(rand::random);
    let scenario = Scenario::load_from_file(&args.path)?;
    let mut runner = ScenarioRunner::new(&scenario, seed)?;
    runner.run(args.duration, args.dt);

    let report = runner.report();

    match args.format.as_str() {
        "text" => {
            println!("Scenario: {}", report.scenario);
            println!("==========");
            println!("Seed: {}", report.seed);
            println!("Simulated: {:.2}s", report.duration);
            println!();
            for event in &report.events {
                println!("[{:>7.2}] {}", event.time, describe(&event.kind));
            }
            println!();
            println!("Alerted cameras: {}", report.alerted_cameras.join(", "));
            println!("Locked doors: {}", report.locked_doors.join(", "));
            println!("Tripped lasers: {}", report.tripped_lasers.join(", "));
        }
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        other => {
            tracing::warn!("Unknown format '{}', defaulting to json", other);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn describe(kind: &EventKind) -> String {
    match kind {
        EventKind::PawnSeen { sensor, pawn } => format!("{sensor} sees {pawn}"),
        EventKind::PawnLost { sensor, pawn } => format!("{sensor} lost sight of {pawn}"),
        EventKind::NoiseHeard {
            sensor,
            pawn,
            location,
            volume,
        } => format!(
            "{sensor} heard {pawn} (volume {volume:.2}) at ({:.0}, {:.0}, {:.0})",
            location[0], location[1], location[2]
        ),
        EventKind::AlarmCue { camera, cue } => format!("{camera} {cue:?}"),
        EventKind::LaserTripped { laser, pawn } => format!("{pawn} broke {laser}"),
        EventKind::LaserCleared { laser, pawn } => format!("{pawn} cleared {laser}"),
        EventKind::DoorLocked { door } => format!("{door} locked"),
        EventKind::DoorUnlocked { door } => format!("{door} unlocked"),
    }
}
