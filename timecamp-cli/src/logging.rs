use tracing_subscriber::EnvFilter;

const FALLBACK: &str = "warn";

/// Filter directive to use: `RUST_LOG` when set and valid, then the
/// configured level, then "warn".
pub fn directive(rust_log: Option<&str>, configured: &str) -> String {
    [rust_log.unwrap_or_default(), configured]
        .into_iter()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty() && EnvFilter::try_new(candidate).is_ok())
        .unwrap_or(FALLBACK)
        .to_string()
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
pub fn init(configured: &str) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::new(directive(rust_log.as_deref(), configured));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
