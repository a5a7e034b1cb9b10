//! Command-line arguments for `marketlens`.
//!
//! # Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `-o, --output` | stdout | Write JSON to a file |
//! | `-v, --verbose` | `false` | Debug logging on stderr |
//! | `--pretty` | `false` | Indented JSON |
//! | `--config` | built-in | Scraper configuration JSON |
//! | `--rules` | built-in | Extraction rule book JSON |
//! | `--categories` | `all` | Category keys or `markets`, `macro`, `news` |
//! | `--rate-limit-delay` | `5` | Seconds between requests to one origin |
//! | `--timeout` | `30` | Per-request timeout in seconds |
//! | `--max-concurrency` | `4` | Categories scraped at once |
//! | `--no-render` | `false` | Never launch a browser |
//!
//! # Examples
//!
//! ```bash
//! marketlens --output data.json --pretty
//! marketlens --categories forex,macro_us,news -v
//! ```

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "marketlens",
    author,
    version,
    about = "Scrape market, macro and news data into validated JSON",
    long_about = "Marketlens fetches market tables, macro indicators and news feeds, \
falling back to a headless browser only when a page needs scripts to show its data.\n\
\n\
Exit codes: 0 when any data was produced, 1 when none was, 2 for invalid \
arguments or configuration."
)]
pub struct Cli {
    /// Write JSON to this file instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Pretty-print JSON output with indentation.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Scraper configuration file (JSON).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Extraction rule book file (JSON). Replaces the built-in rules.
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Comma-separated category keys, or `all`, `markets`, `macro`, `news`.
    #[arg(long, value_delimiter = ',', default_value = "all")]
    pub categories: Vec<String>,

    /// Minimum seconds between requests to the same origin.
    #[arg(long, value_name = "SECONDS")]
    pub rate_limit_delay: Option<f64>,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// How many categories are scraped concurrently.
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Use static fetches only; categories that need rendering fail.
    #[arg(long, default_value_t = false)]
    pub no_render: bool,
}
