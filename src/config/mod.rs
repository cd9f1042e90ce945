//! Configuration module for the EcoAmigo backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite file backing the document store
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Directory receiving the buffered log files
    pub log_dir: PathBuf,
    /// Number of entries the log sink buffers before writing them out
    pub log_buffer_size: usize,
    /// Responses slower than this are reported to the log sink
    pub slow_request_threshold: Duration,
    /// Upper bound on a single store round-trip
    pub store_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let db_path = env::var("ECO_DB_PATH")
            .unwrap_or_else(|_| "./data/eco.sqlite".to_string())
            .into();

        let bind_addr = env::var("ECO_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|e| format!("Invalid ECO_BIND_ADDR format: {}", e))?;

        let log_level = env::var("ECO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("ECO_LOG_DIR")
            .unwrap_or_else(|_| "./logs".to_string())
            .into();

        let log_buffer_size = parse_var("ECO_LOG_BUFFER_SIZE", 10)?;
        if log_buffer_size == 0 {
            return Err("ECO_LOG_BUFFER_SIZE must be at least 1".into());
        }

        let slow_request_threshold =
            Duration::from_millis(parse_var("ECO_SLOW_REQUEST_MS", 1000)?);
        let store_timeout = Duration::from_millis(parse_var("ECO_STORE_TIMEOUT_MS", 5000)?);

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_dir,
            log_buffer_size,
            slow_request_threshold,
            store_timeout,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {} value {:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for name in [
            "ECO_DB_PATH",
            "ECO_BIND_ADDR",
            "ECO_LOG_LEVEL",
            "ECO_LOG_DIR",
            "ECO_LOG_BUFFER_SIZE",
            "ECO_SLOW_REQUEST_MS",
            "ECO_STORE_TIMEOUT_MS",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/eco.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_dir, PathBuf::from("./logs"));
        assert_eq!(config.log_buffer_size, 10);
        assert_eq!(config.slow_request_threshold, Duration::from_millis(1000));
        assert_eq!(config.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("ECO_TEST_PARSE_VAR", "ten");
        let parsed: Result<usize, _> = parse_var("ECO_TEST_PARSE_VAR", 10);
        assert!(parsed.is_err());

        env::set_var("ECO_TEST_PARSE_VAR", " 25 ");
        assert_eq!(parse_var::<usize>("ECO_TEST_PARSE_VAR", 10).unwrap(), 25);
        env::remove_var("ECO_TEST_PARSE_VAR");
    }
}
