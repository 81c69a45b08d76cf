use std::{env, net::SocketAddr, num::NonZeroUsize, time::Duration};

use thiserror::Error;

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    db_dsn: String,
    db_max_connections: u32,
    db_acquire_timeout: Duration,
    fetch_concurrency: NonZeroUsize,
    engagement_batch_size: NonZeroUsize,
    parallel_scoring_threshold: usize,
    rule_daemon_enabled: bool,
    rule_tick_interval: Duration,
    rule_owner_concurrency: NonZeroUsize,
    advisor_base_url: Option<String>,
    advisor_timeout: Duration,
    default_platforms: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// Reads and validates the service configuration from the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `CURATION_DB_DSN` is unset or a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_dsn = env_var("CURATION_DB_DSN")?;
        let http_bind = parse_socket_addr("CURATION_HTTP_BIND", "0.0.0.0:9010")?;

        // pool
        let db_max_connections = parse_u32("CURATION_DB_MAX_CONNECTIONS", 20)?;
        let db_acquire_timeout = parse_duration_secs("CURATION_DB_ACQUIRE_TIMEOUT_SECS", 30)?;

        // discovery fan-out
        let fetch_concurrency = parse_non_zero_usize("CURATION_FETCH_CONCURRENCY", 4)?;
        let engagement_batch_size = parse_non_zero_usize("CURATION_ENGAGEMENT_BATCH_SIZE", 200)?;
        let parallel_scoring_threshold = parse_usize("CURATION_PARALLEL_SCORING_THRESHOLD", 64)?;

        // rule daemon
        let rule_daemon_enabled = parse_bool("CURATION_RULE_DAEMON_ENABLED", true)?;
        let rule_tick_interval = parse_duration_secs("CURATION_RULE_TICK_SECS", 900)?;
        let rule_owner_concurrency = parse_non_zero_usize("CURATION_RULE_OWNER_CONCURRENCY", 4)?;

        let advisor_base_url = env::var("PERFORMANCE_ADVISOR_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let advisor_timeout = parse_duration_ms("PERFORMANCE_ADVISOR_TIMEOUT_MS", 3000)?;
        let default_platforms = parse_csv("DEFAULT_CURATION_PLATFORMS", "twitter,linkedin");
        if default_platforms.is_empty() {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_CURATION_PLATFORMS",
                source: anyhow::anyhow!("at least one platform is required"),
            });
        }

        Ok(Self {
            http_bind,
            db_dsn,
            db_max_connections,
            db_acquire_timeout,
            fetch_concurrency,
            engagement_batch_size,
            parallel_scoring_threshold,
            rule_daemon_enabled,
            rule_tick_interval,
            rule_owner_concurrency,
            advisor_base_url,
            advisor_timeout,
            default_platforms,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn db_dsn(&self) -> &str {
        &self.db_dsn
    }

    #[must_use]
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    #[must_use]
    pub fn db_acquire_timeout(&self) -> Duration {
        self.db_acquire_timeout
    }

    #[must_use]
    pub fn fetch_concurrency(&self) -> NonZeroUsize {
        self.fetch_concurrency
    }

    #[must_use]
    pub fn engagement_batch_size(&self) -> NonZeroUsize {
        self.engagement_batch_size
    }

    #[must_use]
    pub fn parallel_scoring_threshold(&self) -> usize {
        self.parallel_scoring_threshold
    }

    #[must_use]
    pub fn rule_daemon_enabled(&self) -> bool {
        self.rule_daemon_enabled
    }

    #[must_use]
    pub fn rule_tick_interval(&self) -> Duration {
        self.rule_tick_interval
    }

    #[must_use]
    pub fn rule_owner_concurrency(&self) -> NonZeroUsize {
        self.rule_owner_concurrency
    }

    #[must_use]
    pub fn advisor_base_url(&self) -> Option<&str> {
        self.advisor_base_url.as_deref()
    }

    #[must_use]
    pub fn advisor_timeout(&self) -> Duration {
        self.advisor_timeout
    }

    #[must_use]
    pub fn default_platforms(&self) -> &[String] {
        &self.default_platforms
    }
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let parsed = parse_usize(name, default)?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_secs)?;
    Ok(Duration::from_secs(value))
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_ms)?;
    Ok(Duration::from_millis(value))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<u32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}

fn parse_csv(name: &'static str, default: &str) -> Vec<String> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
