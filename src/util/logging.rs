//! Tracing subscriber setup
//!
//! Logs always go to stderr so that stdout stays reserved for plans,
//! tags, and client configuration the user may pipe elsewhere.
//!
//! # Example
//!
//! ```no_run
//! use mcpship::util::logging::{self, LoggingConfig};
//! use tracing::Level;
//!
//! logging::init_logging(LoggingConfig::with_level(Level::DEBUG));
//! tracing::info!(stack = "mcp-server-weather", "Reconciling");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

pub const LOG_LEVEL_ENV: &str = "MCPSHIP_LOG_LEVEL";
pub const LOG_JSON_ENV: &str = "MCPSHIP_LOG_JSON";

/// Dependencies whose own logging is clamped to `warn` unless `RUST_LOG` says otherwise
const NOISY_TARGETS: [&str; 5] = ["h2", "hyper", "reqwest", "aws_smithy_runtime", "aws_config"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// One JSON object per event instead of human-readable lines
    pub use_json: bool,
    pub include_target: bool,
    /// File and line of the event
    pub include_location: bool,
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with full metadata, for CI and log shippers
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }

    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            ..Default::default()
        }
    }

    /// Reads `MCPSHIP_LOG_LEVEL` and `MCPSHIP_LOG_JSON`
    pub fn from_env() -> Self {
        let level = env::var(LOG_LEVEL_ENV)
            .map(|v| parse_level(&v))
            .unwrap_or(Level::INFO);

        Self {
            level,
            use_json: json_requested(),
            ..Default::default()
        }
    }

    /// Filter directives applied on top of `RUST_LOG`
    pub fn directives(&self, rust_log_set: bool) -> Vec<String> {
        let mut directives = vec![format!("{}={}", env!("CARGO_CRATE_NAME"), self.level)];
        if !rust_log_set {
            directives.extend(NOISY_TARGETS.iter().map(|t| format!("{}=warn", t)));
        }
        directives
    }
}

/// Whether `MCPSHIP_LOG_JSON` is set to a truthy value
pub fn json_requested() -> bool {
    env::var(LOG_JSON_ENV)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false)
}

/// Case-insensitive level name; unknown names fall back to INFO
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Installs the global subscriber; later calls are no-ops
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let rust_log_set = env::var("RUST_LOG").is_ok();
        let mut filter = EnvFilter::from_default_env();
        for directive in config.directives(rust_log_set) {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("Ignoring log directive '{}': {}", directive, e),
            }
        }

        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_thread_names(config.include_thread_ids);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        } else {
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_invalid() {
        assert_eq!(parse_level("loud"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_presets() {
        let default = LoggingConfig::default();
        assert_eq!(default.level, Level::INFO);
        assert!(!default.use_json);

        let production = LoggingConfig::production();
        assert!(production.use_json);
        assert!(production.include_location);

        assert_eq!(LoggingConfig::development().level, Level::DEBUG);
    }

    #[test]
    fn test_directives_clamp_noisy_targets() {
        let directives = LoggingConfig::with_level(Level::DEBUG).directives(false);
        assert_eq!(directives[0], "mcpship=DEBUG");
        assert!(directives.contains(&"aws_smithy_runtime=warn".to_string()));
        assert!(directives.contains(&"reqwest=warn".to_string()));
    }

    #[test]
    fn test_directives_respect_rust_log() {
        let directives = LoggingConfig::default().directives(true);
        assert_eq!(directives, ["mcpship=INFO"]);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var(LOG_LEVEL_ENV, "error");
        env::set_var(LOG_JSON_ENV, "true");
        let config = LoggingConfig::from_env();
        env::remove_var(LOG_LEVEL_ENV);
        env::remove_var(LOG_JSON_ENV);

        assert_eq!(config.level, Level::ERROR);
        assert!(config.use_json);
    }
}
