use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

use crate::cli::Cli;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ingest: IngestSettings,
    pub stream: StreamSettings,
    #[serde(default)]
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    pub static_dir: String,
    pub stream_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    pub udp_port: u16,
    pub sample_rate: f64,
    pub max_datagram_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    pub buffer_capacity: usize,
    /// Seconds of silence before a keep-alive comment is sent; 0 disables.
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoConfig {
    pub dataset_path: Option<String>,
}

impl AppConfig {
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.http_port", 7000)?
            .set_default("server.static_dir", "static")?
            .set_default("ingest.udp_port", 5556)?
            .set_default("ingest.sample_rate", 1.0)?
            .set_default("ingest.max_datagram_size", 512)?
            .set_default("stream.buffer_capacity", 1000)?
            .set_default("stream.keep_alive_secs", 15)?
            // Add in settings from configuration file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from environment variables, e.g. ORBITAL__SERVER__HTTP_PORT
            .add_source(Environment::with_prefix("ORBITAL").separator("__"))
            // Command-line flags win
            .set_override_option("server.host", cli.host.clone())?
            .set_override_option("server.http_port", cli.http_port.map(i64::from))?
            .set_override_option("ingest.udp_port", cli.udp_port.map(i64::from))?
            .set_override_option("ingest.sample_rate", cli.sample_rate)?
            .build()?;

        config.try_deserialize()
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }

    pub fn udp_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.ingest.udp_port)
    }

    pub fn stream_url(&self) -> String {
        self.server
            .stream_url
            .clone()
            .unwrap_or_else(|| format!("http://{}/stream", self.http_addr()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load(&Cli::default()).unwrap();

        assert_eq!(config.stream.buffer_capacity, 1000);
        assert_eq!(config.ingest.max_datagram_size, 512);
        assert!(config.geo.dataset_path.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli {
            host: Some("0.0.0.0".to_string()),
            http_port: Some(8123),
            udp_port: Some(9123),
            sample_rate: Some(0.05),
            ..Cli::default()
        };
        let config = AppConfig::load(&cli).unwrap();

        assert_eq!(config.http_addr(), "0.0.0.0:8123");
        assert_eq!(config.udp_addr(), "0.0.0.0:9123");
        assert_eq!(config.ingest.sample_rate, 0.05);
        assert_eq!(config.stream_url(), "http://0.0.0.0:8123/stream");
    }
}
