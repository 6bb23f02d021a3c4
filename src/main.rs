//! Scope-RS - Main Entry Point
//!
//! Headless terminal front end for the live variable inspector. Operator
//! commands are read line by line from stdin:
//!
//! - a plain line replaces the input field and presses Tab
//! - `:hide P` toggles the visibility of process `P`
//! - `:pending on|off` shows or hides variables without a value
//! - `:filter TEXT` sets the name filter (empty clears it)
//! - `:procs`, `:proc P`, `:vars`, `:stats` print the current state
//! - `:quit` exits

use anyhow::Context;
use chrono::Utc;
use scope_rs::{
    config::{self, ScopeConfig},
    pane::{Key, PaneUpdate, ScopeEvent, ScopePane},
    poller::{PollStats, PollerEvent, PollerHandle, PollingAgent},
    registry::VariableRegistry,
    source,
};
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,scope_rs=debug";

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(config::default_config_path);
    let config = match &config_path {
        Some(path) => ScopeConfig::load_or_default(path),
        None => ScopeConfig::default(),
    };

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(&config)?;

    tracing::info!("Starting scope-rs");
    if let Some(path) = &config_path {
        tracing::debug!("Config path: {}", path.display());
    }

    let registry = VariableRegistry::shared();
    let source = source::from_config(&config.source)
        .with_context(|| format!("Failed to open {}", config.source))?;
    let poller = PollingAgent::new(source, registry.clone(), config.polling.clone())
        .spawn()
        .context("Failed to start polling agent")?;

    let mut pane = ScopePane::new(registry, &config);
    let mut last_stats = PollStats::default();

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        drain_events(&poller, &mut last_stats);
        pane.handle(ScopeEvent::Refresh);

        if !run_command(&mut pane, line.trim(), &last_stats) {
            break;
        }
    }

    tracing::info!("Shutting down...");
    let stats = poller.stop()?;
    tracing::info!(
        "Polled {} times ({} value failures, {} topology failures)",
        stats.ticks,
        stats.value_failures,
        stats.topology_failures
    );
    Ok(())
}

fn init_logging(
    config: &ScopeConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let default_filter = config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, guard) = match &config.logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "scope.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn drain_events(poller: &PollerHandle, last_stats: &mut PollStats) {
    for event in poller.drain() {
        match event {
            PollerEvent::ConnectionChanged(connected) => {
                println!(
                    "[source {}]",
                    if connected { "connected" } else { "disconnected" }
                );
            }
            PollerEvent::RequestFailed { request, error } => {
                tracing::debug!("{} failed: {}", request, error);
            }
            PollerEvent::Stats(stats) | PollerEvent::Stopped(stats) => *last_stats = stats,
        }
    }
}

/// Execute one operator line; returns `false` to quit
fn run_command(pane: &mut ScopePane, line: &str, poll_stats: &PollStats) -> bool {
    let (command, arg) = match line.strip_prefix(':') {
        Some(rest) => match rest.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (rest, ""),
        },
        None => {
            pane.handle(ScopeEvent::Cut);
            pane.type_text(line);
            let updates = pane.handle(ScopeEvent::Key(Key::Tab { shift: false }));
            print_updates(pane, &updates);
            return true;
        }
    };

    match command {
        "quit" | "q" => return false,
        "hide" => {
            let updates = pane.handle(ScopeEvent::ProcessClicked {
                process: arg.to_string(),
                modified: true,
            });
            if updates.is_empty() {
                println!("unknown process '{}'", arg);
            }
            print_updates(pane, &updates);
        }
        "pending" => {
            let show = match arg {
                "on" => true,
                "off" => false,
                _ => {
                    println!("usage: :pending on|off");
                    return true;
                }
            };
            let updates = pane.handle(ScopeEvent::ShowPending(show));
            print_updates(pane, &updates);
        }
        "filter" => {
            let updates = pane.state_mut().set_text_filter(arg);
            print_updates(pane, &updates);
        }
        "procs" => {
            for (name, visible) in pane.process_list() {
                println!("[{}] {}", if visible { "x" } else { " " }, name);
            }
        }
        "proc" => {
            let updates = pane.handle(ScopeEvent::ProcessClicked {
                process: arg.to_string(),
                modified: false,
            });
            if updates.is_empty() {
                println!("unknown process '{}'", arg);
            }
            print_updates(pane, &updates);
        }
        "vars" => print_grid(pane),
        "stats" => {
            let stats = pane.state().registry().stats();
            println!(
                "variables: {} total, {} visible, {} pending",
                stats.total_variables, stats.visible_variables, stats.pending_variables
            );
            println!(
                "processes: {} ({} hidden)",
                stats.processes, stats.hidden_processes
            );
            println!(
                "snapshots: {} applied, {} rejected (generation {})",
                stats.snapshots_applied, stats.snapshots_rejected, stats.generation
            );
            println!(
                "polling: {} ticks, {} skipped, {}/{} value failures, {}/{} topology failures",
                poll_stats.ticks,
                poll_stats.skipped_disconnected,
                poll_stats.value_failures,
                poll_stats.value_polls,
                poll_stats.topology_failures,
                poll_stats.topology_polls
            );
        }
        other => println!("unknown command ':{}'", other),
    }
    true
}

fn print_updates(pane: &ScopePane, updates: &[PaneUpdate]) {
    for update in updates {
        match update {
            PaneUpdate::SetInput { text, .. } => println!("> {}", text),
            PaneUpdate::ShowSuggestions(entries) => {
                for entry in entries {
                    println!("  {}", entry);
                }
            }
            PaneUpdate::Alert => println!("\x07(no match)"),
            PaneUpdate::ProcessFocused {
                process,
                subscribes,
                publishes,
            } => {
                println!("{}", process);
                println!("  subscribes: {}", subscribes.join(", "));
                println!("  publishes:  {}", publishes.join(", "));
            }
            PaneUpdate::ProcessVisibility { process, visible } => {
                println!("{} {}", process, if *visible { "shown" } else { "hidden" });
            }
            PaneUpdate::Redraw => {
                tracing::trace!("{} variables visible", pane.grid().variables.len());
            }
            PaneUpdate::HideSuggestions => {}
        }
    }
}

fn print_grid(pane: &ScopePane) {
    let now = Utc::now();
    let view = pane.grid();
    println!(
        "{:<24} {:<8} {:<16} {:>8}  VALUE",
        "NAME", "TYPE", "SOURCE", "AGE"
    );
    for var in &view.variables {
        let age = var
            .age(now)
            .map(|d| format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<8} {:<16} {:>8}  {}",
            var.name,
            var.kind.to_string(),
            var.source,
            age,
            var.display_value()
        );
    }
    println!("({} variables, generation {})", view.variables.len(), view.generation);
}
