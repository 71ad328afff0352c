use crate::errors::{Error, Result};
use crate::writer::MAX_IN_FLIGHT_LIMIT;
use std::env;
use std::str::FromStr;

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub udp_addr: String,
    pub http_addr: String,
    /// `None` keeps records in memory only.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub channel_capacity: usize,
    pub max_in_flight: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            udp_addr: "0.0.0.0:8089".to_string(),
            http_addr: "0.0.0.0:8080".to_string(),
            database_url: None,
            db_max_connections: 20,
            channel_capacity: 10_000,
            max_in_flight: 64,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys fall back to
    /// defaults; set but unparsable keys are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            udp_addr: lookup("UDP_ADDR").unwrap_or(defaults.udp_addr),
            http_addr: lookup("HTTP_ADDR").unwrap_or(defaults.http_addr),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            channel_capacity: parse_or(&lookup, "CHANNEL_CAPACITY", defaults.channel_capacity)?,
            max_in_flight: parse_or(&lookup, "MAX_IN_FLIGHT", defaults.max_in_flight)?,
        };

        if config.channel_capacity == 0 {
            return Err(Error::Config("CHANNEL_CAPACITY must be at least 1".to_string()));
        }
        if config.max_in_flight == 0 {
            return Err(Error::Config("MAX_IN_FLIGHT must be at least 1".to_string()));
        }
        if config.max_in_flight > MAX_IN_FLIGHT_LIMIT {
            return Err(Error::Config(format!(
                "MAX_IN_FLIGHT must be at most {MAX_IN_FLIGHT_LIMIT}"
            )));
        }
        if config.db_max_connections == 0 {
            return Err(Error::Config("DB_MAX_CONNECTIONS must be at least 1".to_string()));
        }

        Ok(config)
    }

    /// Database location with credentials stripped, for logging.
    pub fn database_display(&self) -> &str {
        match &self.database_url {
            Some(url) => url.rsplit('@').next().unwrap_or("***"),
            None => "in-memory",
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database_display(), "in-memory");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("UDP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://gsw:secret@db:5432/telemetry"),
            ("CHANNEL_CAPACITY", "500"),
            ("MAX_IN_FLIGHT", " 8 "),
        ]))
        .unwrap();

        assert_eq!(config.udp_addr, "127.0.0.1:9000");
        assert_eq!(config.channel_capacity, 500);
        assert_eq!(config.max_in_flight, 8);
        assert_eq!(config.database_display(), "db:5432/telemetry");
    }

    #[test]
    fn test_malformed_value_is_error() {
        let err = Config::from_lookup(lookup(&[("CHANNEL_CAPACITY", "lots")])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("CHANNEL_CAPACITY")));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(Config::from_lookup(lookup(&[("MAX_IN_FLIGHT", "0")])).is_err());
    }

    #[test]
    fn test_oversized_worker_pool_rejected() {
        let too_many = (MAX_IN_FLIGHT_LIMIT as u64 + 1).to_string();
        let err = Config::from_lookup(lookup(&[("MAX_IN_FLIGHT", too_many.as_str())])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("MAX_IN_FLIGHT")));

        let limit = MAX_IN_FLIGHT_LIMIT.to_string();
        let config = Config::from_lookup(lookup(&[("MAX_IN_FLIGHT", limit.as_str())])).unwrap();
        assert_eq!(config.max_in_flight, MAX_IN_FLIGHT_LIMIT);
    }

    #[test]
    fn test_empty_database_url_means_memory() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "")])).unwrap();
        assert_eq!(config.database_url, None);
    }
}
