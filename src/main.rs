// BIM ↔ Budget Reconciliation - CLI
// Thin reporting front-end over the library: load JSON records, match, compare, print.

use anyhow::{Context, Result};
use bim_budget_recon::{
    load_budget_items, load_model_elements, write_findings_csv, Comparator, ComparatorConfig,
    FindingKind, MatchMethod, Matcher, Phase, ReconConfig, RunReport, Severity,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bim-budget-recon")]
#[command(about = "Reconcile a BIM model element list against a cost budget", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match model elements to budget items and report discrepancies
    Compare {
        /// Model elements (JSON array)
        #[arg(long)]
        model: PathBuf,

        /// Budget items (JSON array)
        #[arg(long)]
        budget: PathBuf,

        /// Settings file (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Analysis phase: quick or full
        #[arg(long)]
        phase: Option<Phase>,

        /// Relative numeric tolerance (0.01 = 1%)
        #[arg(long)]
        tolerance: Option<f64>,

        /// Identifier matching only (no NAME / DESCRIPTION strategies)
        #[arg(long)]
        no_name_matching: bool,

        /// Write the run report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write findings as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Debug logging
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compare {
            model,
            budget,
            config,
            phase,
            tolerance,
            no_name_matching,
            json,
            csv,
            verbose,
        } => {
            init_tracing(verbose);

            let config = build_config(config, phase, tolerance, no_name_matching)?;
            run_compare(&model, &budget, &config, json, csv)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// File settings first, then phase preset, then single-flag overrides.
fn build_config(
    path: Option<PathBuf>,
    phase: Option<Phase>,
    tolerance: Option<f64>,
    no_name_matching: bool,
) -> Result<ReconConfig> {
    let mut config = match path {
        Some(path) => ReconConfig::from_file(&path)?,
        None => ReconConfig::default(),
    };

    if let Some(phase) = phase {
        debug!("Using {} phase preset: {}", phase, phase.description());
        config.comparator = ComparatorConfig::for_phase(phase);
    }
    if let Some(tolerance) = tolerance {
        config.comparator.tolerance = tolerance;
    }
    if no_name_matching {
        config.matcher = config.matcher.identifiers_only();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run_compare(
    model_path: &Path,
    budget_path: &Path,
    config: &ReconConfig,
    json: Option<PathBuf>,
    csv: Option<PathBuf>,
) -> Result<()> {
    println!("🏗️  BIM ↔ Budget Reconciliation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load inputs
    println!("\n📂 Loading inputs...");
    let models = load_model_elements(model_path)?;
    let budget = load_budget_items(budget_path)?;
    println!("✓ {} model elements, {} budget items", models.len(), budget.len());

    // 2. Match
    println!("\n🔗 Matching...");
    let matcher = Matcher::new(config.matcher.clone())?;
    let matched = matcher.match_records(&models, &budget)?;
    let match_summary = matched.summary();
    for method in MatchMethod::all() {
        if let Some(count) = match_summary.by_method.get(&method) {
            println!("   {:<12} {}", method.to_string(), count);
        }
    }
    println!("✓ {}", match_summary);

    // 3. Compare
    println!("\n⚖️  Comparing (tolerance {}%)...", config.comparator.tolerance * 100.0);
    let comparator = Comparator::new(config.comparator.clone())?;
    let comparison = comparator.compare(&matched)?;

    for kind in FindingKind::all() {
        let count = comparison.by_kind(kind).len();
        if count > 0 {
            println!("   {:<18} {}", kind.to_string(), count);
        }
    }
    for finding in comparison.by_severity(Severity::Error) {
        println!("   ❌ {}", finding);
    }

    // 4. Export
    if let Some(path) = json {
        let report = RunReport::new(&models, &budget, config, &matched, &comparison)?;
        report.write_json(&path)?;
        info!("Run {} written to {:?}", report.run_id, path);
        println!("\n💾 Report: {}", path.display());
    }
    if let Some(path) = csv {
        let rows = write_findings_csv(comparison.findings(), &path)?;
        println!("💾 Findings CSV: {} ({} rows)", path.display(), rows);
    }

    // 5. Verdict
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let summary = comparison.summary();
    if comparison.has_errors() {
        println!("⚠️  {}", summary);
    } else {
        println!("✅ {}", summary);
    }

    Ok(())
}
