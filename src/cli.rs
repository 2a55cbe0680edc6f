//! Command-line interface parsing for paperfeed
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a [`RunConfig`]: the client settings plus what to fetch and how to print it.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::data::{FeedConfig, Mode, MAX_PAPERS_PER_MODE};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified mode name is not recognized
    #[error("Invalid mode: '{0}'. Valid modes: recent, daily, weekly, monthly")]
    InvalidMode(String),
}

/// paperfeed - most-tweeted research papers per category
#[derive(Parser, Debug)]
#[command(name = "paperfeed")]
#[command(about = "Most-tweeted papers per category from papers.labml.ai, cached locally")]
#[command(version)]
pub struct Cli {
    /// Ranking windows to fetch, comma separated
    ///
    /// Valid modes: recent, daily, weekly, monthly
    #[arg(long, value_delimiter = ',', value_name = "MODE")]
    pub modes: Vec<String>,

    /// Papers to request per mode (capped at 250)
    #[arg(long, default_value_t = MAX_PAPERS_PER_MODE)]
    pub limit: usize,

    /// Don't write the fetched feed to the cache file
    #[arg(long)]
    pub no_persist: bool,

    /// Directory holding the cache file (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Cache file name
    #[arg(long, value_name = "NAME")]
    pub cache_name: Option<String>,

    /// Seconds a cache file stays fresh after it was written
    #[arg(long, value_name = "SECS")]
    pub ttl: Option<u64>,

    /// API base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Papers listed per category and mode in the summary
    #[arg(long, default_value_t = 3)]
    pub top: usize,

    /// Print the whole feed as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// How the fetched feed is written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Per-bucket counts with the top papers
    Summary { top: usize },
    /// The full feed as pretty JSON
    Json,
}

/// Everything the binary needs for one run, derived from CLI arguments
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Client settings
    pub feed: FeedConfig,
    /// Validated modes, in the order given
    pub modes: Vec<Mode>,
    /// Requested page size per mode
    pub papers_per_mode: usize,
    /// Whether to write the cache
    pub persist: bool,
    /// Output format
    pub output: OutputFormat,
    /// Number of `-v` flags
    pub verbosity: u8,
}

/// Parses a mode string argument into a Mode.
///
/// # Returns
/// * `Ok(Mode)` if the string names a valid mode
/// * `Err(CliError::InvalidMode)` otherwise
pub fn parse_mode_arg(s: &str) -> Result<Mode, CliError> {
    Mode::from_str(s.trim()).ok_or_else(|| CliError::InvalidMode(s.to_string()))
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments.
    ///
    /// No modes means all four. Fails on the first invalid mode.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let modes = if cli.modes.is_empty() {
            Mode::all().to_vec()
        } else {
            cli.modes
                .iter()
                .map(|s| parse_mode_arg(s))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut feed = FeedConfig::default();
        if let Some(dir) = &cli.cache_dir {
            feed = feed.with_cache_dir(dir.clone());
        }
        if let Some(name) = &cli.cache_name {
            feed = feed.with_cache_name(name.clone());
        }
        if let Some(ttl) = cli.ttl {
            feed = feed.with_cache_ttl(Duration::from_secs(ttl));
        }
        if let Some(url) = &cli.base_url {
            feed = feed.with_base_url(url.clone());
        }

        let output = if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Summary { top: cli.top }
        };

        Ok(RunConfig {
            feed,
            modes,
            papers_per_mode: cli.limit,
            persist: !cli.no_persist,
            output,
            verbosity: cli.verbose,
        })
    }

    /// Mode names as the client expects them
    pub fn mode_names(&self) -> Vec<&'static str> {
        self.modes.iter().map(Mode::as_str).collect()
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "paperfeed=info",
            _ => "paperfeed=debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_arg_valid() {
        assert_eq!(parse_mode_arg("recent").unwrap(), Mode::Recent);
        assert_eq!(parse_mode_arg(" monthly ").unwrap(), Mode::Monthly);
    }

    #[test]
    fn test_parse_mode_arg_invalid() {
        let err = parse_mode_arg("yearly").unwrap_err();
        assert!(err.to_string().contains("Invalid mode"));
        assert!(err.to_string().contains("yearly"));
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["paperfeed"]);
        assert!(cli.modes.is_empty());
        assert_eq!(cli.limit, 250);
        assert!(!cli.no_persist);
        assert_eq!(cli.top, 3);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_parse_comma_separated_modes() {
        let cli = Cli::parse_from(["paperfeed", "--modes", "daily,weekly"]);
        assert_eq!(cli.modes, vec!["daily", "weekly"]);
    }

    #[test]
    fn test_run_config_defaults() {
        let cli = Cli::parse_from(["paperfeed"]);
        let config = RunConfig::from_cli(&cli).unwrap();

        assert_eq!(config.modes, Mode::all().to_vec());
        assert_eq!(config.papers_per_mode, 250);
        assert!(config.persist);
        assert_eq!(config.output, OutputFormat::Summary { top: 3 });
        assert_eq!(config.feed.cache_name, "papers.pkl");
        assert_eq!(config.feed.cache_ttl, Duration::from_secs(1000));
        assert_eq!(config.log_filter(), "warn");
    }

    #[test]
    fn test_run_config_overrides() {
        let cli = Cli::parse_from([
            "paperfeed",
            "--modes",
            "weekly",
            "--limit",
            "40",
            "--no-persist",
            "--cache-dir",
            "/tmp/feeds",
            "--cache-name",
            "feed.json",
            "--ttl",
            "60",
            "--base-url",
            "http://localhost:8080/",
            "--json",
            "-vv",
        ]);
        let config = RunConfig::from_cli(&cli).unwrap();

        assert_eq!(config.modes, vec![Mode::Weekly]);
        assert_eq!(config.mode_names(), vec!["weekly"]);
        assert_eq!(config.papers_per_mode, 40);
        assert!(!config.persist);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.feed.cache_dir, PathBuf::from("/tmp/feeds"));
        assert_eq!(config.feed.cache_name, "feed.json");
        assert_eq!(config.feed.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.feed.base_url, "http://localhost:8080");
        assert_eq!(config.log_filter(), "paperfeed=debug");
    }

    #[test]
    fn test_run_config_invalid_mode() {
        let cli = Cli::parse_from(["paperfeed", "--modes", "recent,yearly"]);
        let result = RunConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::InvalidMode(ref m)) if m == "yearly"));
    }
}
