//! File configuration for CLI defaults.
//!
//! The file uses one `key = value` pair per line, `#` comments, double-quoted
//! strings, bare integers and `true`/`false`. CLI flags override file values.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use harvester_core::query::{
    DEFAULT_MAX_SOURCES_PER_PROVIDER, DEFAULT_MIN_TOTAL_SOURCES, MAX_SOURCES_PER_PROVIDER_LIMIT,
};
use harvester_core::{DEFAULT_PROVIDER_TIMEOUT, ProviderFamily, ProviderId, Vertical};

use crate::cli::Args;

/// Defaults loaded from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Providers to query when `--provider` is not given.
    pub providers: Option<Vec<String>>,
    /// Default maximum sources per provider (1..=50).
    pub max_per_provider: Option<usize>,
    /// Default minimum total sources.
    pub min_total: Option<usize>,
    /// Default per-call timeout in seconds (1..=600).
    pub timeout_secs: Option<u64>,
    /// Default question vertical.
    pub vertical: Option<Vertical>,
    /// Extra path keywords.
    pub keywords: Option<Vec<String>>,
    /// Use the JSON-answer prompt.
    pub structured: Option<bool>,
    /// Run the follow-up round when yield is low.
    pub follow_up: Option<bool>,
    /// Ask uncited providers to list their URLs.
    pub verify: Option<bool>,
    /// Probe final sources with HEAD requests.
    pub check_reachability: Option<bool>,
}

impl FileConfig {
    /// Validates config values against CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_per_provider
            && !(1..=MAX_SOURCES_PER_PROVIDER_LIMIT).contains(&max)
        {
            bail!(
                "Invalid config value for `max_per_provider`: {max}. Expected range: 1..={MAX_SOURCES_PER_PROVIDER_LIMIT}"
            );
        }
        if let Some(timeout) = self.timeout_secs
            && !(1..=600).contains(&timeout)
        {
            bail!("Invalid config value for `timeout_secs`: {timeout}. Expected range: 1..=600");
        }
        if let Some(providers) = &self.providers
            && providers.is_empty()
        {
            bail!("Invalid config value for `providers`: expected at least one provider name");
        }
        Ok(())
    }
}

/// Effective settings for one run: CLI flags over file values over defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Providers to enable; empty means every provider with an API key.
    pub providers: Vec<ProviderId>,
    /// Maximum sources kept per provider response.
    pub max_per_provider: usize,
    /// Minimum total sources.
    pub min_total: usize,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Question vertical.
    pub vertical: Vertical,
    /// Extra path keywords from file and CLI.
    pub keywords: Vec<String>,
    /// Use the JSON-answer prompt.
    pub structured: bool,
    /// Allow the follow-up round.
    pub follow_up: bool,
    /// Run the verification pass.
    pub verify: bool,
    /// Probe final sources.
    pub check_reachability: bool,
}

impl RunSettings {
    /// Merges CLI arguments over file configuration.
    pub fn resolve(args: &Args, file: &FileConfig) -> Result<Self> {
        let providers = if args.providers.is_empty() {
            file.providers
                .iter()
                .flatten()
                .map(|name| {
                    name.parse::<ProviderFamily>()
                        .map(ProviderFamily::id)
                        .map_err(anyhow::Error::msg)
                        .context("Invalid `providers` entry in config file")
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            args.providers.iter().map(|family| family.id()).collect()
        };

        let mut keywords = file.keywords.clone().unwrap_or_default();
        keywords.extend(args.keywords.iter().cloned());

        Ok(Self {
            providers,
            max_per_provider: args
                .max_per_provider
                .map(usize::from)
                .or(file.max_per_provider)
                .unwrap_or(DEFAULT_MAX_SOURCES_PER_PROVIDER),
            min_total: args
                .min_total
                .or(file.min_total)
                .unwrap_or(DEFAULT_MIN_TOTAL_SOURCES),
            timeout: args
                .timeout_secs
                .or(file.timeout_secs)
                .map_or(DEFAULT_PROVIDER_TIMEOUT, Duration::from_secs),
            vertical: args.vertical.or(file.vertical).unwrap_or_default(),
            keywords,
            structured: args.structured || file.structured.unwrap_or(false),
            follow_up: !args.no_follow_up && file.follow_up.unwrap_or(true),
            verify: args.verify || file.verify.unwrap_or(false),
            check_reachability: args.check_reachability || file.check_reachability.unwrap_or(false),
        })
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/harvester/config.toml`
/// 2. `$HOME/.config/harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join("harvester").join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("harvester")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Loads and validates one config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "providers" => {
                cfg.providers = Some(parse_list(&parse_string_literal(value).with_context(context)?));
            }
            "max_per_provider" => {
                cfg.max_per_provider = Some(parse_integer_usize(value).with_context(context)?);
            }
            "min_total" => {
                cfg.min_total = Some(parse_integer_usize(value).with_context(context)?);
            }
            "timeout_secs" => {
                cfg.timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "vertical" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.vertical = Some(parsed.parse::<Vertical>().map_err(anyhow::Error::msg).with_context(context)?);
            }
            "keywords" => {
                cfg.keywords = Some(parse_list(&parse_string_literal(value).with_context(context)?));
            }
            "structured" => cfg.structured = Some(parse_boolean(value).with_context(context)?),
            "follow_up" => cfg.follow_up = Some(parse_boolean(value).with_context(context)?),
            "verify" => cfg.verify = Some(parse_boolean(value).with_context(context)?),
            "check_reachability" => {
                cfg.check_reachability = Some(parse_boolean(value).with_context(context)?);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_integer_usize(raw_value: &str) -> Result<usize> {
    let value = parse_integer_u64(raw_value)?;
    usize::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for usize"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str("max_per_provider = 12\nverify = true\n").unwrap();
        assert_eq!(cfg.max_per_provider, Some(12));
        assert_eq!(cfg.verify, Some(true));
        assert_eq!(cfg.min_total, None);
    }

    #[test]
    fn test_parse_config_lists_and_vertical() {
        let cfg = parse_config_str(
            "providers = \"openai, anthropic\" # two of three\nvertical = \"finance\"\nkeywords = \"livret,pea\"",
        )
        .unwrap();
        assert_eq!(cfg.providers.unwrap(), ["openai", "anthropic"]);
        assert_eq!(cfg.vertical, Some(Vertical::Finance));
        assert_eq!(cfg.keywords.unwrap(), ["livret", "pea"]);
    }

    #[test]
    fn test_parse_config_rejects_unknown_key() {
        let err = parse_config_str("concurrency = 4").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_parse_config_rejects_out_of_range_values() {
        assert!(parse_config_str("max_per_provider = 0").is_err());
        assert!(parse_config_str("max_per_provider = 51").is_err());
        assert!(parse_config_str("timeout_secs = 601").is_err());
        assert!(parse_config_str("min_total = -1").is_err());
    }

    #[test]
    fn test_parse_config_rejects_bad_syntax() {
        assert!(parse_config_str("just a line").is_err());
        assert!(parse_config_str("verify = yes").is_err());
        assert!(parse_config_str("vertical = finance").is_err());
        assert!(parse_config_str("vertical = \"astrology\"").is_err());
    }

    #[test]
    fn test_hash_inside_string_is_not_a_comment() {
        let cfg = parse_config_str("keywords = \"c#,rust\"").unwrap();
        assert_eq!(cfg.keywords.unwrap(), ["c#", "rust"]);
    }

    fn args(extra: &[&str]) -> Args {
        use clap::Parser;
        let mut argv = vec!["harvester", "question"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_resolve_defaults_without_file_or_flags() {
        let settings = RunSettings::resolve(&args(&[]), &FileConfig::default()).unwrap();
        assert!(settings.providers.is_empty());
        assert_eq!(settings.max_per_provider, DEFAULT_MAX_SOURCES_PER_PROVIDER);
        assert_eq!(settings.min_total, DEFAULT_MIN_TOTAL_SOURCES);
        assert_eq!(settings.timeout, DEFAULT_PROVIDER_TIMEOUT);
        assert!(settings.follow_up);
        assert!(!settings.verify);
    }

    #[test]
    fn test_resolve_cli_overrides_file() {
        let file = parse_config_str(
            "providers = \"gemini\"\nmax_per_provider = 20\ntimeout_secs = 30\nfollow_up = true\nkeywords = \"livret\"",
        )
        .unwrap();
        let settings = RunSettings::resolve(
            &args(&["-p", "openai", "-n", "5", "--no-follow-up", "-k", "pea"]),
            &file,
        )
        .unwrap();
        assert_eq!(settings.providers, [ProviderId::from("openai")]);
        assert_eq!(settings.max_per_provider, 5);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(!settings.follow_up);
        assert_eq!(settings.keywords, ["livret", "pea"]);
    }

    #[test]
    fn test_resolve_file_providers_accept_aliases() {
        let file = parse_config_str("providers = \"claude, google\"").unwrap();
        let settings = RunSettings::resolve(&args(&[]), &file).unwrap();
        assert_eq!(settings.providers, [ProviderId::from("anthropic"), ProviderId::from("gemini")]);
    }

    #[test]
    fn test_resolve_rejects_unknown_file_provider() {
        let file = parse_config_str("providers = \"mistral\"").unwrap();
        assert!(RunSettings::resolve(&args(&[]), &file).is_err());
    }

    #[test]
    fn test_load_file_config_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "min_total = 15\nfollow_up = false\n").unwrap();
        let cfg = load_file_config(&path).unwrap();
        assert_eq!(cfg.min_total, Some(15));
        assert_eq!(cfg.follow_up, Some(false));
    }

    #[test]
    fn test_load_file_config_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_file_config(&dir.path().join("missing.toml")).is_err());
    }
}
