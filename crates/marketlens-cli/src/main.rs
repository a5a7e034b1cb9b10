mod cli;
mod error;
mod logging;
mod output;
mod settings;

use clap::Parser;
use std::process::ExitCode;

use marketlens_core::Pipeline;
use tracing::info;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = settings::scraper_config(&cli, std::env::var_os(settings::CHROME_PATH_ENV))?;
    let rules = settings::rule_book(&cli)?;
    let categories = settings::categories(&cli.categories)?;

    let pipeline = Pipeline::from_config(config, rules)?;
    let aggregate = pipeline.run(&categories).await?;

    output::render(&aggregate, cli.output.as_deref(), cli.pretty)?;
    if let Some(path) = &cli.output {
        info!(path = %path.display(), "output saved");
    }

    if !aggregate.is_success() {
        return Err(CliError::NoData {
            error_count: aggregate.errors.len(),
        });
    }
    Ok(ExitCode::SUCCESS)
}
