//! Logging and tracing initialization.

use crate::config::LoggingConfig;

/// Crates whose events a bare level such as `"debug"` applies to.
const RANDRBAR_TARGETS: &[&str] = &[
    "randrbar_common",
    "randrbar_platform_core",
    "randrbar_platform_linux",
    "randrbar",
];

/// Expand the configured level into filter directives.
///
/// A bare level is scoped to randrbar crates with everything else at `warn`,
/// so `debug` does not turn on x11rb's request tracing. Anything containing
/// `=` or `,` is taken as a full directive string.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let level = if level.is_empty() { "info" } else { level };

    let mut directives = String::from("warn");
    for target in RANDRBAR_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// Initialize the tracing subscriber with the given configuration.
///
/// Events go to stderr so command output on stdout stays parseable.
/// `RUST_LOG` takes precedence over `config.level`. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(
            builder
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };

    if installed.is_ok() {
        tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
