use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogConfig;

/// Sets up the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. Fails if a
/// subscriber is already installed.
pub fn init_logger(config: &LogConfig) -> Result<(), String> {
    let env_filter = build_filter(config, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;

    let fmt_layer = if config.json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_level(true)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| format!("failed to initialize logger: {}", e))
}

/// Picks the filter directives: a usable `RUST_LOG` value wins, otherwise
/// the configured filter must parse.
fn build_filter(config: &LogConfig, from_env: Option<String>) -> Result<EnvFilter, String> {
    if let Some(filter) = from_env.and_then(|value| EnvFilter::try_new(value).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|e| format!("invalid log filter {:?}: {}", config.filter, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(filter: &str) -> LogConfig {
        LogConfig {
            filter: filter.to_string(),
            json: false,
        }
    }

    #[test]
    fn test_rejects_bad_filter() {
        let err = build_filter(&config("pod_monitor=notalevel"), None).unwrap_err();
        assert!(err.starts_with("invalid log filter"));
    }

    #[test]
    fn test_environment_filter_wins() {
        let filter = build_filter(&config("pod_monitor=notalevel"), Some("debug".to_string()));
        assert_eq!(filter.unwrap().to_string(), "debug");

        let filter = build_filter(&config("info"), Some("x=notalevel".to_string()));
        assert_eq!(filter.unwrap().to_string(), "info");
    }
}
