//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file (`:memory:` for a throwaway database)
    pub database_path: String,
    /// HTTP server port
    pub server_port: u16,
    /// TTL in seconds for cached task reads
    pub cache_ttl: u64,
    /// Interval in seconds between expired cache entry sweeps
    pub cache_cleanup_interval: u64,
    /// Delay in seconds between completing a task and purging it
    pub purge_delay: u64,
    /// Interval in seconds between polls of the purge queue
    pub purge_poll_interval: u64,
    /// Attempts allowed for a purge job before it is dropped
    pub purge_max_attempts: u32,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_PATH` - SQLite file path (default: tasks.db)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_TTL` - Cache TTL in seconds (default: 60)
    /// - `CACHE_CLEANUP_INTERVAL` - Cache sweep frequency in seconds (default: 30)
    /// - `PURGE_DELAY` - Delay before a completed task is purged (default: 600)
    /// - `PURGE_POLL_INTERVAL` - Purge queue poll frequency in seconds (default: 5)
    /// - `PURGE_MAX_ATTEMPTS` - Attempts per purge job (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            cache_ttl: parse_var("CACHE_TTL", defaults.cache_ttl),
            cache_cleanup_interval: parse_var(
                "CACHE_CLEANUP_INTERVAL",
                defaults.cache_cleanup_interval,
            ),
            purge_delay: parse_var("PURGE_DELAY", defaults.purge_delay),
            purge_poll_interval: parse_var("PURGE_POLL_INTERVAL", defaults.purge_poll_interval),
            purge_max_attempts: parse_var("PURGE_MAX_ATTEMPTS", defaults.purge_max_attempts),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn purge_delay(&self) -> Duration {
        Duration::from_secs(self.purge_delay)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "tasks.db".to_string(),
            server_port: 3000,
            cache_ttl: 60,
            cache_cleanup_interval: 30,
            purge_delay: 600,
            purge_poll_interval: 5,
            purge_max_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.database_path, "tasks.db");
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_ttl, 60);
        assert_eq!(config.purge_delay, 600);
        assert_eq!(config.purge_max_attempts, 3);
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.purge_delay(), Duration::from_secs(600));
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("DATABASE_PATH");
        env::remove_var("CACHE_TTL");
        env::remove_var("PURGE_DELAY");
        env::remove_var("PURGE_POLL_INTERVAL");

        let config = Config::from_env();
        assert_eq!(config.database_path, "tasks.db");
        assert_eq!(config.cache_ttl, 60);
        assert_eq!(config.purge_delay, 600);
        assert_eq!(config.purge_poll_interval, 5);
    }

    #[test]
    fn test_parse_var_falls_back_on_garbage() {
        env::set_var("MINI_TASKS_TEST_GARBAGE", "not-a-number");
        assert_eq!(parse_var("MINI_TASKS_TEST_GARBAGE", 42u64), 42);
        env::remove_var("MINI_TASKS_TEST_GARBAGE");
    }
}
