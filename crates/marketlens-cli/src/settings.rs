//! Builds the run configuration: defaults, then `--config`, then flag
//! overrides, then the browser path from the environment.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use marketlens_core::{Category, RuleBook, ScraperConfig};

use crate::cli::Cli;
use crate::error::CliError;

pub const CHROME_PATH_ENV: &str = "MARKETLENS_CHROME_PATH";

pub fn scraper_config(cli: &Cli, chrome_path: Option<OsString>) -> Result<ScraperConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => ScraperConfig::from_json_file(path)?,
        None => ScraperConfig::default(),
    };

    if let Some(delay) = cli.rate_limit_delay {
        config.rate_limit_delay = seconds("--rate-limit-delay", delay)?;
    }
    if let Some(timeout) = cli.timeout {
        config.http_timeout = seconds("--timeout", timeout)?;
    }
    if let Some(max_concurrency) = cli.max_concurrency {
        config.max_concurrency = max_concurrency;
    }
    if cli.no_render {
        config.render.enabled = false;
    }
    if let Some(path) = chrome_path.filter(|path| !path.is_empty()) {
        config.render.chrome_executable = Some(PathBuf::from(path));
    }

    config.validate()?;
    Ok(config)
}

pub fn rule_book(cli: &Cli) -> Result<RuleBook, CliError> {
    match &cli.rules {
        Some(path) => Ok(RuleBook::from_json_file(path)?),
        None => Ok(RuleBook::default()),
    }
}

/// Expands `--categories` tokens into a sorted, duplicate-free list.
pub fn categories(tokens: &[String]) -> Result<Vec<Category>, CliError> {
    let mut selected = BTreeSet::new();
    for token in tokens.iter().filter(|token| !token.trim().is_empty()) {
        selected.extend(Category::expand(token)?);
    }
    if selected.is_empty() {
        return Err(CliError::Argument(String::from("no categories selected")));
    }
    Ok(selected.into_iter().collect())
}

fn seconds(flag: &str, value: f64) -> Result<Duration, CliError> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| CliError::Argument(format!("{flag} must be a non-negative number of seconds")))
}
