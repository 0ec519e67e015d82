//! CLI entry point for the harvester tool.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{
    ExtractionOrchestrator, ReachabilityChecker, ResearchQuery, SourcePolicy,
    build_default_providers,
};
use tracing::{debug, info};

mod cli;
mod config;
mod output;

use cli::Args;
use config::RunSettings;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so --json output on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = match &args.config {
        Some(path) => config::load_file_config(path)?,
        None => {
            let loaded = config::load_default_file_config()?;
            if let (Some(path), Some(_)) = (&loaded.path, &loaded.config) {
                debug!(path = %path.display(), "loaded config file");
            }
            loaded.config.unwrap_or_default()
        }
    };
    let settings = RunSettings::resolve(&args, &file_config)?;
    debug!(?settings, "effective settings");

    let providers = build_default_providers(|name| std::env::var(name).ok());
    let enabled = if settings.providers.is_empty() {
        providers.iter().map(|p| p.id()).collect()
    } else {
        settings.providers.clone()
    };

    let mut query = ResearchQuery::builder(args.question.as_str())
        .providers(enabled)
        .max_sources_per_provider(settings.max_per_provider)
        .min_total_sources(settings.min_total);
    if let Some(context) = &args.context {
        query = query.context(context.as_str());
    }
    let query = query.build()?;

    let policy = SourcePolicy::for_vertical(settings.vertical).with_keywords(&settings.keywords);
    let mut orchestrator = ExtractionOrchestrator::new(providers, Arc::new(policy))
        .timeout(settings.timeout)
        .follow_up(settings.follow_up)
        .verify(settings.verify)
        .structured(settings.structured);
    if settings.check_reachability {
        orchestrator = orchestrator
            .reachability(ReachabilityChecker::new().context("Failed to set up reachability checks")?);
    }

    info!(
        providers = query.enabled_providers().len(),
        vertical = %settings.vertical,
        "Harvester starting"
    );

    let spinner = output::start_spinner(
        !args.quiet && !args.json && io::stderr().is_terminal(),
        query.enabled_providers().len(),
    );
    let result = orchestrator.run(&query).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let result = result?;

    if args.json {
        println!("{}", output::render_json(&result)?);
    } else {
        print!("{}", output::render_table(&result, output::terminal_width()));
    }

    Ok(())
}
