//! Configuration management for the Lingua server

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Maximum accepted upload size in bytes (whole file or single chunk)
    pub max_file_size: usize,
    /// Per-strategy extraction timeout in seconds
    pub extraction_timeout_secs: u64,
    /// Allowed overshoot of a chunk over its declared size (0.10 = 10%)
    pub chunk_size_tolerance: f64,
    /// Inactivity timeout after which a chunk session is evicted, seconds
    pub session_timeout_secs: i64,
    /// Interval between reaper sweeps, seconds
    pub reaper_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            ingest: IngestConfig::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            max_file_size: 100 * 1024 * 1024,
            extraction_timeout_secs: 30,
            chunk_size_tolerance: 0.10,
            session_timeout_secs: 60 * 60,
            reaper_interval_secs: 5 * 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = IngestConfig::default();
        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            ingest: IngestConfig {
                max_file_size: env_parse("MAX_FILE_SIZE", defaults.max_file_size),
                extraction_timeout_secs: env_parse(
                    "EXTRACTION_TIMEOUT_SECS",
                    defaults.extraction_timeout_secs,
                ),
                chunk_size_tolerance: env_parse(
                    "CHUNK_SIZE_TOLERANCE",
                    defaults.chunk_size_tolerance,
                ),
                session_timeout_secs: env_parse(
                    "SESSION_TIMEOUT_SECS",
                    defaults.session_timeout_secs,
                ),
                reaper_interval_secs: env_parse(
                    "REAPER_INTERVAL_SECS",
                    defaults.reaper_interval_secs,
                ),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.ingest.extraction_timeout_secs, 30);
        assert!(config.ingest.chunk_size_tolerance > 0.0);
        assert_eq!(config.ingest.session_timeout_secs, 3600);
    }
}
