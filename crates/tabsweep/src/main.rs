//! Offline tools for tabsweep retention settings.
//!
//! # Examples
//!
//! ```sh
//! # Replay a scripted session and print what got closed, and when
//! tabsweep simulate session.json
//!
//! # Same session under a different configuration, machine-readable
//! tabsweep simulate session.json --config tabsweep.json --json
//!
//! # Show every scheduler decision
//! tabsweep simulate session.json -vv
//!
//! # Validate a configuration file and list dropped override rules
//! tabsweep check-config tabsweep.json
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tabsweep::RetentionConfig;
use tabsweep::sim::{Scenario, SimReport, run_scenario};
use tracing::Level;

#[derive(Parser)]
#[command(name = "tabsweep", version, about = "Positional tab retention tools")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scenario file on a virtual clock
    Simulate {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Configuration file replacing the scenario's own `config`
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load a configuration file and report what takes effect
    CheckConfig {
        /// Configuration JSON file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Command::Simulate {
            scenario,
            config,
            json,
        } => simulate(&scenario, config.as_deref(), json),
        Command::CheckConfig { file } => check_config(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Evictions log at info, timer bookkeeping at debug, keep decisions at trace.
fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn simulate(path: &Path, config: Option<&Path>, json: bool) -> Result<(), String> {
    let mut scenario = Scenario::load(path)?;
    if let Some(config_path) = config {
        scenario = scenario.with_config(RetentionConfig::load(config_path)?);
    }

    let report = run_scenario(&scenario)?;
    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {e}"))?;
        println!("{text}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SimReport) {
    println!("Simulated {}s", report.elapsed_seconds);

    if report.evictions.is_empty() {
        println!("\nNo tabs closed.");
    } else {
        println!("\nClosed ({}):", report.evictions.len());
        for eviction in &report.evictions {
            println!(
                "  {:>6}s  {:<24} {}",
                eviction.at_seconds, eviction.label, eviction.key
            );
        }
    }

    println!("\nStill open ({}):", report.tabs.len());
    for tab in &report.tabs {
        let mut flags = Vec::new();
        if tab.pinned {
            flags.push("pinned");
        }
        if tab.dirty {
            flags.push("dirty");
        }
        if tab.active {
            flags.push("active");
        }
        if flags.is_empty() {
            println!("  [{}] {}", tab.column, tab.label);
        } else {
            println!("  [{}] {} ({})", tab.column, tab.label, flags.join(", "));
        }
    }
}

fn check_config(path: &Path) -> Result<(), String> {
    let config = RetentionConfig::load(path)?;
    let (rules, diagnostics) = config.override_rules();

    let text = serde_json::to_string_pretty(&config)
        .map_err(|e| format!("Failed to serialize config: {e}"))?;
    println!("{text}");

    if !config.enabled {
        println!("\nRetention is disabled.");
    }
    println!(
        "\nEffective wait: {}s, {} override rule(s) active",
        config.wait().as_secs(),
        rules.len()
    );
    for rule in rules.iter() {
        println!(
            "  {:<24} retain {}, wait {}s",
            rule.pattern,
            rule.retention_count,
            rule.wait.as_secs()
        );
    }
    if !diagnostics.is_empty() {
        println!("\nDropped ({}):", diagnostics.len());
        for diagnostic in &diagnostics {
            println!("  {diagnostic}");
        }
    }
    Ok(())
}
