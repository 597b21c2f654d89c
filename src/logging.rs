use tracing_subscriber::EnvFilter;

/// Map repeated `-v` flags to a default filter directive.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` wins over the verbosity flag when it is set. Logs go to stderr
/// so JSON and CSV output on stdout stay clean.
pub fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("enrollment_funding={}", level_for(verbose))));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();

    tracing::debug!("logging initialized at verbosity {}", verbose);
}
