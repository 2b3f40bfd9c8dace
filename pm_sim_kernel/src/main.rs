/// PM Simulator Kernel v1: Demo Harness
///
/// Loads an event catalog and a scripted playthrough, plays it through the
/// engine, replays the resulting decision log to confirm the hash matches,
/// and prints the final report.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pm_sim_kernel::catalog::EventCatalog;
use pm_sim_kernel::engine::SimulationEngine;
use pm_sim_kernel::feedback::{format_budget, FinalReport};
use pm_sim_kernel::hashing::canonical_hash;
use pm_sim_kernel::invariants::ValidationMode;
use pm_sim_kernel::scenario::Scenario;
use pm_sim_kernel::script::{parse_script, run_script};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "pm-sim", about = "Play a scripted PM simulator session and print the report")]
struct Cli {
    #[arg(long, default_value = "fixtures/catalog.json")]
    catalog: PathBuf,
    #[arg(long, default_value = "fixtures/script.json")]
    script: PathBuf,
    /// Scenario JSON; the built-in scenario when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Reject defectsResolved > defectsFound and negative quality counters.
    #[arg(long)]
    strict: bool,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level/filter '{log_level}'"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("telemetry error: {err}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let scenario = match &cli.scenario {
        Some(path) => Scenario::from_path(path)?,
        None => Scenario::default(),
    };
    let catalog = EventCatalog::from_path(&cli.catalog)?;
    let script_json = fs::read_to_string(&cli.script)
        .with_context(|| format!("failed to read script {}", cli.script.display()))?;
    let steps = parse_script(&script_json)?;
    let mode = if cli.strict {
        ValidationMode::Strict
    } else {
        ValidationMode::Permissive
    };
    info!(scenario = %scenario.id, events = catalog.events.len(), steps = steps.len(), "starting playthrough");

    // Run 1
    let mut engine = SimulationEngine::new(scenario.clone()).with_validation(mode);
    let log = run_script(&mut engine, &catalog, &steps)?;
    let h1 = canonical_hash(engine.state());
    let report = engine.complete_game()?;

    // Run 2 (determinism check)
    let mut engine2 = SimulationEngine::new(scenario).with_validation(mode);
    let h2 = canonical_hash(engine2.replay(&log)?);
    if h1 != h2 {
        bail!("replay diverged: {h1} != {h2}");
    }
    info!(decisions = log.len(), hash = %h1, "replay matched");

    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&engine, &report, &h1),
    }
    Ok(())
}

fn print_report(engine: &SimulationEngine, report: &FinalReport, hash: &str) {
    let state = engine.state();
    let b = &report.breakdown;
    println!("=== {} ===", engine.scenario().title);
    println!(
        "BAC {}  AC {}  EV {}  PV {}",
        format_budget(state.planned_budget),
        format_budget(state.actual_cost),
        format_budget(state.earned_value),
        format_budget(state.planned_value)
    );
    println!(
        "CPI {:.2} ({})  SPI {:.2} ({})  elapsed {}/{} months, delay {}",
        b.metrics.cpi,
        report.cpi_status.label(),
        b.metrics.spi,
        report.spi_status.label(),
        state.elapsed_months,
        state.total_months,
        state.delay_months()
    );
    println!(
        "Risks: {} total, {} unmitigated, {} occurred",
        report.risks.total, report.risks.unmitigated, report.risks.occurred
    );
    println!(
        "Stakeholders: average {:.1}, lowest {} ({})",
        report.stakeholders.average, report.stakeholders.min_name, report.stakeholders.min_satisfaction
    );
    println!();
    for category in &report.categories {
        println!(
            "[{}] {:<24} {:>3}  {}",
            category.grade,
            category.category.title(),
            category.score,
            category.message
        );
    }
    println!();
    println!("Final score {} - rank {} ({})", b.final_score, b.rank, b.rank.label());
    println!("{}", report.overall);
    println!();
    println!("State hash: {}", hash);
}
