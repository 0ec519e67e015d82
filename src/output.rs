//! CLI output formatting and display helpers.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::Result;
use harvester_core::{ExtractionResult, ValidatedSource};
use indicatif::{ProgressBar, ProgressStyle};

/// Returns terminal width from COLUMNS, or 100 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 40)
        .unwrap_or(100)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// Starts a stderr spinner for the provider fan-out when requested.
pub fn start_spinner(enabled: bool, providers: usize) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Asking {providers} provider(s)..."));
    Some(spinner)
}

fn reachability_label(source: &ValidatedSource) -> &'static str {
    match source.reachable {
        Some(true) => "up",
        Some(false) => "down",
        None => "-",
    }
}

/// Renders the ranked table and the run summary.
pub fn render_table(result: &ExtractionResult, width: usize) -> String {
    let mut out = String::new();
    let url_width = width.saturating_sub(44).max(20);

    let _ = writeln!(
        out,
        "{:>3}  {:>5}  {:<18}  {:>4}  {:<4}  URL",
        "#", "SCORE", "TIER", "PROV", "UP"
    );
    for (rank, source) in result.sources.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:>5.3}  {:<18}  {:>4}  {:<4}  {}",
            rank + 1,
            source.combined_score(),
            source.tier().as_str(),
            source.providers.len(),
            reachability_label(source),
            truncate_to_width(&source.canonical_url, url_width),
        );
        if !source.display_name.is_empty() {
            let _ = writeln!(
                out,
                "{:>46}{}",
                "",
                truncate_to_width(&source.display_name, url_width)
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} source(s) from {} provider(s) in {} round(s)",
        result.sources.len(),
        result.succeeded_providers.len(),
        result.rounds_executed
    );
    for (provider, count) in &result.per_provider_counts {
        let _ = writeln!(out, "  {provider}: {count}");
    }
    for failure in &result.failures {
        let first_line = failure.error.to_string();
        let first_line = first_line.lines().next().unwrap_or_default();
        let _ = writeln!(
            out,
            "  {} failed ({} round): {}",
            failure.provider, failure.round, first_line
        );
    }
    if result.below_minimum {
        let _ = writeln!(out, "Warning: fewer sources than the requested minimum");
    }
    out
}

/// Renders the result as pretty JSON.
pub fn render_json(result: &ExtractionResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
