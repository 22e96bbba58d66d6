use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::backend::DataSource;
use crate::Result;

pub const CONFIG_FILE: &str = "pod-monitor.toml";
pub const ENV_PREFIX: &str = "POD_MONITOR__";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// The Prometheus-compatible backend queries are proxied to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrometheusConfig {
    pub url: String,
    /// Bearer token sent with every backend request
    pub token: Option<String>,
    /// Upper bound for a single backend call
    #[serde(with = "humantime_serde")]
    pub query_timeout: Duration,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9090".to_string(),
            token: None,
            query_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    /// Emit JSON lines instead of the compact format
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "pod_monitor=info,tower_http=info".to_string(),
            json: false,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    pub server: ServerConfig,
    pub prometheus: PrometheusConfig,
    pub log: LogConfig,
}

impl Configuration {
    /// Defaults, then `pod-monitor.toml`, then `POD_MONITOR__SECTION__KEY`
    /// environment variables.
    pub fn load() -> Result<Self> {
        Ok(Self::figment().extract()?)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn data_source(&self) -> DataSource {
        DataSource {
            url: self.prometheus.url.clone(),
            token: self.prometheus.token.clone(),
        }
    }
}
