use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the application.
///
/// `RUST_LOG` wins when it is set; otherwise `default_level` is used.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(default_level)));

    // try_init so tests can call this more than once
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Turns the configured level into a filter directive.
///
/// Level names are matched case-insensitively and `warning` is accepted for
/// `warn`. Anything else that parses as an `EnvFilter`, such as `off` or
/// `senkyou=debug,axum=warn`, is used as is; the rest falls back to `info`.
pub fn level_directive(level: &str) -> String {
    let lower = level.to_lowercase();
    match lower.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" | "off" => lower,
        "warning" => "warn".to_string(),
        _ if EnvFilter::try_new(level).is_ok() => level.to_string(),
        _ => "info".to_string(),
    }
}
