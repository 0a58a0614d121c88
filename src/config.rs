use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use vocab_review_algo::{Offsets, SchedulerError, DEFAULT_BASE_LOW, DEFAULT_BASE_MEDIUM};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub data_dir: PathBuf,
    pub default_offsets: Offsets,
    pub session_idle_ttl: Duration,
    pub session_cleanup_enabled: bool,
    pub session_cleanup_schedule: String,
    /// Rejected DEFAULT_BASE_* values, reported once logging is up
    rejected_offsets: Option<SchedulerError>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse::<u16>("PORT").unwrap_or(3000);

        let host = env_parse::<IpAddr>("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let data_dir = std::env::var("DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let base_low = env_parse::<u32>("DEFAULT_BASE_LOW").unwrap_or(DEFAULT_BASE_LOW);
        let base_medium = env_parse::<u32>("DEFAULT_BASE_MEDIUM").unwrap_or(DEFAULT_BASE_MEDIUM);
        let (default_offsets, rejected_offsets) = resolve_offsets(base_low, base_medium);

        let session_idle_ttl =
            Duration::from_secs(env_parse::<u64>("SESSION_IDLE_TTL_SECS").unwrap_or(3600));

        let session_cleanup_enabled = std::env::var("ENABLE_SESSION_CLEANUP")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let session_cleanup_schedule = std::env::var("SESSION_CLEANUP_SCHEDULE")
            .unwrap_or_else(|_| "0 */5 * * * *".to_string());

        Self {
            host,
            port,
            log_level,
            data_dir,
            default_offsets,
            session_idle_ttl,
            session_cleanup_enabled,
            session_cleanup_schedule,
            rejected_offsets,
        }
    }

    /// Config for tests and embedding: defaults everywhere, given data directory.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            log_level: "info".to_string(),
            data_dir: data_dir.into(),
            default_offsets: Offsets::default(),
            session_idle_ttl: Duration::from_secs(3600),
            session_cleanup_enabled: false,
            session_cleanup_schedule: "0 */5 * * * *".to_string(),
            rejected_offsets: None,
        }
    }

    /// Logs settings that were ignored while reading the environment.
    pub fn report_rejected(&self) {
        if let Some(err) = &self.rejected_offsets {
            tracing::warn!(error = %err, "invalid default offsets, using built-in defaults");
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn resolve_offsets(base_low: u32, base_medium: u32) -> (Offsets, Option<SchedulerError>) {
    match Offsets::new(base_low, base_medium) {
        Ok(offsets) => (offsets, None),
        Err(err) => (Offsets::default(), Some(err)),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_offsets_falls_back_to_defaults() {
        let (offsets, rejected) = resolve_offsets(3, 7);
        assert_eq!((offsets.base_low(), offsets.base_medium()), (3, 7));
        assert!(rejected.is_none());

        let (offsets, rejected) = resolve_offsets(0, 500);
        assert_eq!(offsets, Offsets::default());
        assert!(matches!(
            rejected,
            Some(SchedulerError::InvalidConfiguration { base_low: 0, base_medium: 500 })
        ));
    }

    #[test]
    fn test_with_data_dir() {
        let config = Config::with_data_dir("/tmp/words");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/words"));
        assert_eq!(config.log_level, "info");
        assert!(config.rejected_offsets.is_none());
        assert!(!config.session_cleanup_enabled);
    }
}
