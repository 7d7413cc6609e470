//! Debris Watch CLI
//!
//! Loads a tracked-object catalog, runs one risk engine pass and writes the
//! report as JSON.
//!
//! Usage:
//!   debris-watch --catalog data/sample_catalog.json \
//!                --config engine.json \
//!                --filler 200 --seed 42 \
//!                --output report.json

use anyhow::{Context, Result};
use clap::Parser;
use debris_watch::{loader, parse_timestamp, run, EngineConfig, RunOptions};
use orbital_mechanics::{Catalog, FillerRequest, SimplifiedPropagator};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "debris-watch",
    about = "Propagate a debris catalog, screen conjunctions and plan avoidance maneuvers"
)]
struct Args {
    /// Path to catalog JSON file
    #[arg(short, long, default_value = "data/sample_catalog.json")]
    catalog: PathBuf,

    /// Engine config JSON (partial files override only the keys they name)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Synthetic filler objects for density visualization
    #[arg(long, default_value_t = 0)]
    filler: usize,

    /// Seed for filler and synthetic conjunctions
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Use seeded placeholder conjunctions instead of the closest-approach search
    #[arg(long)]
    synthetic: bool,

    /// Analysis time (RFC 3339), defaults to now
    #[arg(long)]
    at: Option<String>,

    /// Output JSON file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays pure JSON
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Debris Watch: orbital risk engine");
    info!("{}", "=".repeat(60));

    let config = match &args.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading config {:?}", path))?,
        None => EngineConfig::default(),
    };
    let at = args.at.as_deref().map(parse_timestamp).transpose()?;

    let objects = loader::load_catalog(&args.catalog).with_context(|| format!("loading catalog {:?}", args.catalog))?;
    let catalog = Catalog::new(Arc::new(SimplifiedPropagator::new(config.constants)));
    catalog.load(objects);

    let options = RunOptions {
        at,
        filler: (args.filler > 0).then_some(FillerRequest {
            count: args.filler,
            seed: args.seed,
        }),
        synthetic_seed: args.synthetic.then_some(args.seed),
    };
    let report = run(&config, &catalog, &options);

    match &args.output {
        Some(path) => {
            info!("Writing report to {:?}", path);
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &report)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
    }

    // Summary
    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Tracked objects: {}", report.risk.total_objects);
    info!(
        "Conjunctions: {} ({} alert, {} watch, {} safe)",
        report.risk.critical_conjunctions.len(),
        report.risk.risk_zones.alert,
        report.risk.risk_zones.watch,
        report.risk.risk_zones.safe
    );
    info!(
        "Collision probability: 24h {:.3e} | 7d {:.3e} | 30d {:.3e}",
        report.risk.collision_probability.next_24h,
        report.risk.collision_probability.next_week,
        report.risk.collision_probability.next_month
    );
    for strategy in &report.strategies {
        for plan in &strategy.planned_maneuvers {
            info!(
                "  {} | sat {} vs {} | {:?} | {:.3} m/s | {:.2} kg",
                plan.maneuver_id,
                plan.satellite_id,
                plan.threat_id,
                plan.maneuver_type,
                plan.delta_v_m_s,
                plan.fuel.fuel_mass_kg
            );
        }
    }

    Ok(())
}
