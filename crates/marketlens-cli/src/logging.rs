use tracing_subscriber::EnvFilter;

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Logs go to stderr so stdout carries only JSON. `RUST_LOG` wins over
/// `--verbose`.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
