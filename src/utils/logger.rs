// Logger initialization

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub const DEFAULT_FILTER: &str = "findoc_analyzer=debug,tower_http=debug";

/// Console logging, plus a daily-rolling file under `LOG_DIR` when set.
///
/// Keep the returned guard alive for the life of the process or buffered
/// file output is lost.
pub fn init_logger(config: &LoggingConfig) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "findoc-analyzer.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// `RUST_LOG` when it parses, otherwise [`DEFAULT_FILTER`].
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    config
        .filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let config = LoggingConfig {
            filter: None,
            log_dir: None,
        };
        let filter = env_filter(&config).to_string();
        assert!(filter.contains("findoc_analyzer=debug"));
        assert!(filter.contains("tower_http=debug"));
    }

    #[test]
    fn test_rust_log_overrides_default() {
        let config = LoggingConfig {
            filter: Some("warn".to_string()),
            log_dir: None,
        };
        assert_eq!(env_filter(&config).to_string(), "warn");
    }
}
