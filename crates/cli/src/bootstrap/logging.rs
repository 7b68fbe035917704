use tracing_subscriber::EnvFilter;

/// Initialize tracing. `RUST_LOG` wins; the CLI flag is the fallback,
/// then `info`.
pub fn init(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
