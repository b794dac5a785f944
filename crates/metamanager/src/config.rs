//! Engine configuration

use crate::modules::EDGE_HUB;
use std::path::PathBuf;
use std::time::Duration;

/// Metadata engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file (env: META_DB_PATH)
    pub db_path: PathBuf,
    /// Queue capacity of every bus module (env: META_BUFFER_SIZE)
    pub buffer_size: usize,
    /// Deadline of one upstream round trip (env: META_REMOTE_QUERY_TIMEOUT_MS)
    pub remote_query_timeout: Duration,
    /// Period of the self-issued sync; zero disables it (env: META_SYNC_INTERVAL_SECS)
    pub sync_interval: Duration,
    /// Resource path the periodic sync reconciles (env: META_SYNC_RESOURCE)
    pub sync_resource: String,
    /// Module that carries upstream queries (env: META_HUB_MODULE)
    pub hub_module: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            db_path: std::env::var("META_DB_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/var/lib/edge/metamanager.db")),
            buffer_size: std::env::var("META_BUFFER_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|size| *size > 0)
                .unwrap_or(1024),
            remote_query_timeout: std::env::var("META_REMOTE_QUERY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_secs(30)),
            sync_interval: std::env::var("META_SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(60)),
            sync_resource: std::env::var("META_SYNC_RESOURCE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "PodStatus".into()),
            hub_module: std::env::var("META_HUB_MODULE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| EDGE_HUB.into()),
        }
    }

    pub fn sync_enabled(&self) -> bool {
        !self.sync_interval.is_zero()
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn with_remote_query_timeout(mut self, timeout: Duration) -> Self {
        self.remote_query_timeout = timeout;
        self
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    pub fn with_sync_resource(mut self, resource: impl Into<String>) -> Self {
        self.sync_resource = resource.into();
        self
    }

    pub fn with_hub_module(mut self, module: impl Into<String>) -> Self {
        self.hub_module = module.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_override_environment() {
        let config = Config::default()
            .with_buffer_size(0)
            .with_sync_interval(Duration::ZERO)
            .with_hub_module("hub-mock");
        assert_eq!(config.buffer_size, 1);
        assert!(!config.sync_enabled());
        assert_eq!(config.hub_module, "hub-mock");
    }
}
