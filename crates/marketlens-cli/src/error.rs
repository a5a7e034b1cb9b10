use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] marketlens_core::ValidationError),

    #[error(transparent)]
    Core(#[from] marketlens_core::CoreError),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("no data was produced ({error_count} error(s))")]
    NoData { error_count: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Core(_) | Self::Argument(_) => 2,
            Self::NoData { .. } | Self::Serialization(_) | Self::Io { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_problems_exit_with_two() {
        let err = CliError::Core(marketlens_core::CoreError::Config(String::from("bad")));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(CliError::Argument(String::from("x")).exit_code(), 2);
    }

    #[test]
    fn empty_run_exits_with_one() {
        let err = CliError::NoData { error_count: 24 };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "no data was produced (24 error(s))");
    }
}
