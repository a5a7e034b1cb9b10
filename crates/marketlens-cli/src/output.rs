use std::io::Write;
use std::path::Path;

use marketlens_core::AggregateOutput;

use crate::error::CliError;

pub fn to_json(output: &AggregateOutput, pretty: bool) -> Result<String, CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    Ok(payload)
}

/// Writes the run to `path`, or to stdout when no path is given.
pub fn render(output: &AggregateOutput, path: Option<&Path>, pretty: bool) -> Result<(), CliError> {
    let payload = to_json(output, pretty)?;
    match path {
        Some(path) => {
            let io_error = |source: std::io::Error| CliError::Io {
                path: path.display().to_string(),
                source,
            };
            let mut file = std::fs::File::create(path).map_err(io_error)?;
            file.write_all(payload.as_bytes()).map_err(io_error)?;
            file.write_all(b"\n").map_err(io_error)?;
        }
        None => println!("{payload}"),
    }
    Ok(())
}
