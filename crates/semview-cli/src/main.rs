use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use semview_classifier::OpenAiBackend;
use semview_core::{Config, ModelOutcome, RunReport, Severity};
use semview_engine::{GeneratedView, Pipeline};

const DEFAULT_CONFIG: &str = "semview.toml";

/// semview - Generate semantic views for dbt models
#[derive(Parser)]
#[command(name = "semview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directories to scan for semantic folders (default: model_roots from config)
    roots: Vec<PathBuf>,

    /// Path to config file (default: semview.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Classify and render, but print instead of writing files
    #[arg(long)]
    dry_run: bool,

    /// Save the run report as JSON
    #[arg(short, long)]
    report: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(report) if report.has_failures() => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: &Cli) -> Result<RunReport> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    let mut config = load_config(cli.config.as_deref(), cli.verbose)?;
    config.apply_env_overrides();

    if cli.verbose {
        eprintln!("{} dialect: {:?}, classifier: {}", "Using".cyan(), config.dialect, config.classifier.model);
    }

    let backend = OpenAiBackend::from_config(&config.classifier).context("cannot set up the classification endpoint")?;

    let roots: Vec<PathBuf> = if cli.roots.is_empty() {
        config.model_roots.iter().map(|root| config.project_root.join(root)).collect()
    } else {
        cli.roots.clone()
    };

    let pipeline = Pipeline::new(config, backend)
        .context("failed to prepare the semantic view template")?
        .with_dry_run(cli.dry_run);

    let mut report = RunReport::new();
    let views = pipeline.run(&roots, &mut report).await;

    if cli.dry_run {
        print_dry_run(&views);
    }
    print_summary(&report, cli.dry_run);

    if let Some(path) = &cli.report {
        report
            .save_to_file(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        eprintln!("{} {}", "Report written to".cyan(), path.display());
    }

    Ok(report)
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path).with_context(|| format!("failed to load {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG);
    if default_path.exists() {
        return Config::from_file(default_path).with_context(|| format!("failed to load {}", DEFAULT_CONFIG));
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

fn print_dry_run(views: &[GeneratedView]) {
    for view in views {
        println!("{} {} (would write {})", "--".dimmed(), view.model.bold(), view.path.display());
        println!("{}", view.contents);
    }
}

/// Print per-model outcomes and diagnostics to stdout
fn print_summary(report: &RunReport, dry_run: bool) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Semantic View Generation".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    if report.models.is_empty() {
        println!("{}", "No models found under semantic folders.".yellow());
    }

    for record in &report.models {
        match &record.outcome {
            ModelOutcome::Generated { path, version, needs_review } => {
                let verb = if dry_run { "would write" } else { "wrote" };
                print!("  {} {} {} {} (v{})", "✓".green().bold(), record.model.bold(), verb, path.display(), version);
                if *needs_review > 0 {
                    print!(" {}", format!("[{} column(s) need review]", needs_review).yellow());
                }
                println!();
            }
            ModelOutcome::Skipped { reason } => {
                println!("  {} {} skipped: {}", "-".yellow().bold(), record.model.bold(), reason);
            }
            ModelOutcome::Failed { reason } => {
                println!("  {} {} failed: {}", "✗".red().bold(), record.model.bold(), reason);
            }
        }
    }

    let notable: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity != Severity::Info)
        .collect();
    if !notable.is_empty() {
        println!();
        println!("{}", "Diagnostics:".bold());
        for diag in notable {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };
            println!("  [{}] {}: {}", severity_str, diag.code.as_str(), diag.message);
            if let Some(loc) = &diag.location {
                println!("    at {}", loc.file);
            }
        }
    }

    let summary = &report.summary;
    println!();
    println!("{}", "Summary:".bold());
    println!("  Models found: {}", summary.models_found);
    println!("  Generated:    {}", format!("{}", summary.generated).green());
    if summary.skipped > 0 {
        println!("  Skipped:      {}", format!("{}", summary.skipped).yellow());
    } else {
        println!("  Skipped:      {}", summary.skipped);
    }
    if summary.failed > 0 {
        println!("  Failed:       {}", format!("{}", summary.failed).red().bold());
    } else {
        println!("  Failed:       {}", format!("{}", summary.failed).green());
    }
    println!("{}", "=".repeat(60).bright_blue());
}
