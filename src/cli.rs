//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use harvester_core::{ProviderFamily, Vertical};

/// Ask several LLM providers a research question and harvest the sources they cite.
///
/// Harvester fans the question out to every provider with an API key
/// (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GEMINI_API_KEY`), extracts and
/// validates the URLs in their answers, merges duplicates across providers
/// and prints one ranked list.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Research question to ask every provider
    pub question: String,

    /// Extra context appended to the question
    #[arg(long)]
    pub context: Option<String>,

    /// Provider to query (repeatable; default: every provider with an API key)
    #[arg(short = 'p', long = "provider", value_parser = parse_provider)]
    pub providers: Vec<ProviderFamily>,

    /// Maximum sources kept per provider response (1-50)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub max_per_provider: Option<u8>,

    /// Minimum total sources before a follow-up round is triggered
    #[arg(short = 'm', long)]
    pub min_total: Option<usize>,

    /// Timeout for each provider call in seconds (1-600)
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout_secs: Option<u64>,

    /// Question vertical selecting authority allowlists (general, finance, health, technology)
    #[arg(long, value_parser = parse_vertical)]
    pub vertical: Option<Vertical>,

    /// Extra URL path keyword that raises extraction confidence (repeatable)
    #[arg(short = 'k', long = "keyword")]
    pub keywords: Vec<String>,

    /// Ask providers for a JSON list of sources instead of free text
    #[arg(long)]
    pub structured: bool,

    /// Never run the follow-up round
    #[arg(long)]
    pub no_follow_up: bool,

    /// Ask providers without explicit citations to list their URLs
    #[arg(long)]
    pub verify: bool,

    /// Send a HEAD request to every final source and report reachability
    #[arg(long)]
    pub check_reachability: bool,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_provider(value: &str) -> Result<ProviderFamily, String> {
    value.parse()
}

fn parse_vertical(value: &str) -> Result<Vertical, String> {
    value.parse()
}
