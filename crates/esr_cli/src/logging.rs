use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub json_format: bool,
    /// Include file/line info.
    pub include_location: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            json_format: false,
            include_location: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn from_flags(verbose: bool, json_format: bool) -> Self {
        Self {
            level: if verbose { Level::DEBUG } else { Level::WARN },
            json_format,
            include_location: verbose,
            ..Self::default()
        }
    }

    fn default_directives(&self) -> String {
        format!("esr_core={},esr_cli={}", self.level, self.level)
    }
}

/// Install the global subscriber. Logs go to stderr; stdout carries the JSON output.
/// `RUST_LOG` overrides the configured level.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_flag_raises_level() {
        let quiet = LoggingConfig::from_flags(false, false);
        assert_eq!(quiet.level, Level::WARN);
        assert!(!quiet.include_location);

        let loud = LoggingConfig::from_flags(true, true);
        assert_eq!(loud.level, Level::DEBUG);
        assert!(loud.json_format);
        assert_eq!(loud.default_directives(), "esr_core=DEBUG,esr_cli=DEBUG");
    }
}
