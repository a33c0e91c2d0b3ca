//! `retriever` – run one object-retrieval mission.
//!
//! ```text
//! retriever [CONFIG]        run a mission (CONFIG defaults to retriever.toml)
//! retriever --print-config  print the default configuration as TOML
//! ```
//!
//! The mission runs against the in-process simulated arena described by the
//! `[arena]` section.  When it ends, successfully or not, the elapsed time is
//! appended to `metrics_path`.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use colored::Colorize;
use retriever_hal::{MotionStats, Rover, SimArena};
use retriever_runtime::{LogFormat, MissionReport, MissionSequencer, init_tracing, metrics};
use tracing::{error, warn};

fn main() -> ExitCode {
    let arg = std::env::args().nth(1);

    if arg.as_deref() == Some("--print-config") {
        return match config::to_toml(&config::Config::default()) {
            Ok(raw) => {
                print!("{raw}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Config error".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    let path = arg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
    let cfg = match config::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    // ── Structured logging ────────────────────────────────────────────────
    let _telemetry = init_tracing(&cfg.telemetry);
    let human = cfg.telemetry.format == LogFormat::Compact;

    if human {
        print_banner();
        println!(
            "  Arena: {} marker(s), robot at ({:.2}, {:.2}){}",
            cfg.arena.objects.len(),
            cfg.arena.start.x,
            cfg.arena.start.y,
            if cfg.arena.realtime { ", realtime".dimmed().to_string() } else { String::new() }
        );
        println!();
    }

    let rover = Rover::new(SimArena::new(cfg.arena.clone()));
    let mut mission = match MissionSequencer::new(rover, cfg.mission) {
        Ok(mission) => mission,
        Err(e) => {
            error!(error = %e, "invalid mission configuration");
            return ExitCode::FAILURE;
        }
    };

    let clock = Instant::now();
    let outcome = mission.run();
    let elapsed = match &outcome {
        Ok(report) => report.elapsed(),
        Err(_) => clock.elapsed(),
    };

    // ── Metrics sink ──────────────────────────────────────────────────────
    if let Err(e) = metrics::append_elapsed(&cfg.metrics_path, elapsed) {
        warn!(error = %e, path = %cfg.metrics_path.display(), "failed to append run time");
    }

    match outcome {
        Ok(report) => {
            if human {
                print_report(&report, mission.motion_stats());
            } else {
                match serde_json::to_string(&report) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!(error = %e, "failed to serialise mission report"),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, placed = mission.registry().placed().len(), "mission aborted");
            if human {
                println!("\n  {} {}", "✗ Mission aborted:".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║          Retriever Mission           ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!(
        "  {} {}",
        "retriever".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!();
}

fn print_report(report: &MissionReport, stats: MotionStats) {
    let delivered: Vec<String> = report.delivered.iter().map(|m| m.to_string()).collect();
    println!();
    println!("  {} Mission complete", "✓".green().bold());
    println!("    run id        {}", report.run_id.to_string().dimmed());
    println!("    rally point   {}", report.rally_point.to_string().bold());
    println!("    delivered     {}", delivered.join(", "));
    println!("    requeues      {}", report.requeues);
    println!("    grasp fails   {}", report.grasp_failures);
    println!("    rally radius  {:.2} m", report.final_rally_distance);
    println!(
        "    motion        {} turn(s), {} drive(s), {} scan(s)",
        stats.rotations, stats.drives, stats.scans
    );
    println!("    elapsed       {:.2} s", report.elapsed_secs);
    println!();
}
