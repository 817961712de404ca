//! `lanesweep` – command line entry point for the lane-sweeping vehicle.
//!
//! 1. Loads `~/.lanesweep/config.toml` (or `--config FILE`), applying
//!    `LANESWEEP_*` environment overrides.
//! 2. Initialises logging, with optional file mirror and OTLP export.
//! 3. Opens the motor-controller link (or the log-only simulation) and the
//!    perception feed: a replay file, or JSON Lines frames on stdin from the
//!    vision process.
//! 4. Runs the control loop until the feed ends or **Ctrl-C** is pressed,
//!    then sends a final `Stop`.

mod config;

use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use lanesweep_hal::{CommandSink, PerceptionSource, ReplaySource, SimulatedSink, open_serial};
use lanesweep_nav::NavigationEngine;
use lanesweep_runtime::{ControlLoop, LoopConfig, LoopEnd, LoopSummary, TelemetryConfig, init_tracing};
use lanesweep_types::{PerceptionFrame, SweepError};

#[derive(Parser, Debug)]
#[command(
    name = "lanesweep",
    version,
    about = "Navigation controller for a lane-sweeping vehicle"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the vehicle from a perception feed
    Run {
        /// Replay recorded frames from FILE instead of reading stdin
        #[arg(long, value_name = "FILE")]
        replay: Option<PathBuf>,

        /// Pause between replayed frames, in milliseconds
        #[arg(long, value_name = "MS", requires = "replay")]
        interval_ms: Option<u64>,

        /// Config file to use instead of ~/.lanesweep/config.toml
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Log commands instead of writing to the serial port
        #[arg(long)]
        simulate: bool,

        /// Emit JSON logs
        #[arg(long)]
        json_logs: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the defaults to the config file if it does not exist
        #[arg(long)]
        init: bool,

        /// Config file to use instead of ~/.lanesweep/config.toml
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Print the JSON schema of one perception frame (replay file record)
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            replay,
            interval_ms,
            config,
            simulate,
            json_logs,
        } => run(RunArgs {
            replay,
            interval: interval_ms.map(Duration::from_millis),
            config,
            simulate,
            json_logs,
        }),
        Commands::Config { init, config } => show_config(init, config),
        Commands::Schema => print_schema(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// run
// ─────────────────────────────────────────────────────────────────────────────

struct RunArgs {
    replay: Option<PathBuf>,
    interval: Option<Duration>,
    config: Option<PathBuf>,
    simulate: bool,
    json_logs: bool,
}

fn run(args: RunArgs) -> ExitCode {
    let path = args.config.clone().unwrap_or_else(config::config_path);
    let (mut cfg, found) = match config::load_or_default(&path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    cfg.serial.simulate |= args.simulate;

    let telemetry = TelemetryConfig {
        json: args.json_logs,
        log_file: cfg.runtime.log_file.clone(),
    };
    let _guard = match init_tracing("lanesweep", &telemetry) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}: {}", "Logging error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    if !args.json_logs {
        print_banner();
    }
    if found {
        info!(path = %path.display(), "config loaded");
    } else {
        info!(path = %path.display(), "no config file, using defaults");
    }

    match drive(&cfg, &args) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn drive(cfg: &config::Config, args: &RunArgs) -> Result<LoopSummary, SweepError> {
    let engine = NavigationEngine::new(cfg.navigation.clone())?;
    let source = open_source(args)?;
    let sink: Box<dyn CommandSink> = if cfg.serial.simulate {
        Box::new(SimulatedSink::new())
    } else {
        Box::new(open_serial(&cfg.serial.port, cfg.serial.baud_rate)?)
    };

    let control = ControlLoop::new(
        engine,
        source,
        sink,
        LoopConfig {
            sink_queue_capacity: cfg.runtime.sink_queue_capacity,
            ..LoopConfig::default()
        },
    )?;

    let shutdown = control.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – stopping the vehicle …".yellow().bold());
        shutdown.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    control.run()
}

fn open_source(args: &RunArgs) -> Result<Box<dyn PerceptionSource>, SweepError> {
    let Some(path) = &args.replay else {
        info!("reading perception frames from stdin");
        return Ok(Box::new(ReplaySource::new("stdin", BufReader::new(std::io::stdin()))));
    };
    let mut source = ReplaySource::open(path)?;
    if let Some(interval) = args.interval {
        source = source.with_interval(interval);
    }
    Ok(Box::new(source))
}

fn print_summary(summary: &LoopSummary) {
    let snap = &summary.final_snapshot;
    let reason = match summary.end {
        LoopEnd::SourceExhausted => "perception feed ended",
        LoopEnd::ShutdownRequested => "operator shutdown",
    };
    println!();
    println!("  {} {}", "✓".green().bold(), reason);
    println!("  run       {}", summary.run_id.to_string().dimmed());
    println!("  ticks     {}", summary.ticks);
    println!(
        "  lanes     {}/{}{}",
        snap.lane_index,
        snap.total_lanes,
        if snap.coverage_complete() {
            " (field covered)".green().to_string()
        } else {
            String::new()
        }
    );
    println!(
        "  commands  {} sent, {} failed, {} dropped",
        summary.sink.sent, summary.sink.failed, summary.dropped
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// config / schema
// ─────────────────────────────────────────────────────────────────────────────

fn show_config(init: bool, path: Option<PathBuf>) -> ExitCode {
    let path = path.unwrap_or_else(config::config_path);
    let (cfg, found) = match config::load_or_default(&path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    if init && !found {
        if let Err(e) = config::save_to(&config::Config::default(), &path) {
            eprintln!("{}: {}", "Error saving config".red(), e);
            return ExitCode::FAILURE;
        }
        println!("  {} Config saved to {}", "✓".green().bold(), path.display().to_string().bold());
    } else if found {
        println!("  Config loaded from {}", path.display().to_string().bold());
    } else {
        println!("  {} (defaults shown)", "No config file".yellow());
    }

    if let Err(e) = cfg.navigation.validate() {
        println!("  {} {}", "✗".red().bold(), e);
    }
    match toml::to_string_pretty(&cfg) {
        Ok(text) => {
            println!();
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Failed to serialize config".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn print_schema() -> ExitCode {
    let schema = schemars::schema_for!(PerceptionFrame);
    match serde_json::to_string_pretty(&schema) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", SweepError::Serialization(e.to_string()));
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   __                 ____                    "#.bold().cyan());
    println!("{}", r#"  / /  ___ ____  ___ / __/    _____ ___ ___   "#.bold().cyan());
    println!("{}", r#" / /__/ _ `/ _ \/ -_)\ \| |/|/ / -_) -_) _ \  "#.bold().cyan());
    println!("{}", r#"/____/\_,_/_//_/\__/___/|__,__/\__/\__/ .__/  "#.bold().cyan());
    println!("{}", r#"                                     /_/      "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "LaneSweep".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Lane-sweeping navigation controller");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_replay_and_simulate() {
        let cli = Cli::try_parse_from([
            "lanesweep", "run", "--replay", "field.jsonl", "--interval-ms", "33", "--simulate",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                replay,
                interval_ms,
                simulate,
                ..
            } => {
                assert_eq!(replay, Some(PathBuf::from("field.jsonl")));
                assert_eq!(interval_ms, Some(33));
                assert!(simulate);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn interval_requires_replay() {
        assert!(Cli::try_parse_from(["lanesweep", "run", "--interval-ms", "33"]).is_err());
    }

    #[test]
    fn replay_file_feeds_simulated_run() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"observations":[{{"id":40,"distance_m":0.1,"lateral_cm":0.0}}]}}"#).unwrap();
        writeln!(file, r#"{{"perimeter_proximity":400}}"#).unwrap();
        file.flush().unwrap();

        let mut cfg = config::Config::default();
        cfg.serial.simulate = true;
        let args = RunArgs {
            replay: Some(file.path().to_path_buf()),
            interval: None,
            config: None,
            simulate: true,
            json_logs: false,
        };

        let summary = drive(&cfg, &args).unwrap();
        assert_eq!(summary.end, LoopEnd::SourceExhausted);
        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.final_snapshot.lane_index, 1);
        assert_eq!(summary.sink.sent, 3);
    }
}
