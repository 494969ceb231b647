use std::borrow::Cow;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;

pub const ENV_LIGHTWEIGHT: &str = "NEXTER_LIGHTWEIGHT";
pub const ENV_MAX_WORKERS: &str = "NEXTER_MAX_WORKERS";
pub const ENV_KEEP_ALIVE_MS: &str = "NEXTER_KEEP_ALIVE_MS";
pub const ENV_STACK_SIZE: &str = "NEXTER_STACK_SIZE";

static GLOBAL: Lazy<Config> = Lazy::new(Config::from_env);

/// Settings for enumerators and the worker pool behind them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether random-access sources iterated with `"each"` and no arguments
    /// skip the worker thread and are indexed directly.
    pub lightweight: bool,
    pub pool: PoolConfig,
}

/// Settings for a [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on worker threads alive at once. Every suspended
    /// thread-backed enumerator holds one.
    pub max_workers: usize,
    /// How long an idle worker waits for another traversal before exiting.
    pub keep_alive: Duration,
    /// How long a saturated pool waits for a worker to be released before its
    /// single retry.
    pub reclaim_grace: Duration,
    /// Prefix of worker thread names.
    pub thread_name: Cow<'static, str>,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lightweight: true,
            pool: PoolConfig::default(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_workers: 1024,
            keep_alive: Duration::from_secs(60),
            reclaim_grace: Duration::from_millis(50),
            thread_name: Cow::Borrowed("nexter-worker"),
            stack_size: None,
        }
    }
}

impl Config {
    /// The process-wide configuration, read from the environment on first
    /// use.
    pub fn global() -> &'static Config {
        &GLOBAL
    }

    /// Reads the configuration from `NEXTER_*` environment variables, falling
    /// back to defaults for unset or malformed values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], with variables looked up through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        if let Some(lightweight) = parse_bool(&lookup, ENV_LIGHTWEIGHT) {
            config.lightweight = lightweight;
        }
        if let Some(max) = parse::<usize>(&lookup, ENV_MAX_WORKERS) {
            if max == 0 {
                tracing::warn!(key = ENV_MAX_WORKERS, "ignoring zero worker limit");
            } else {
                config.pool.max_workers = max;
            }
        }
        if let Some(ms) = parse::<u64>(&lookup, ENV_KEEP_ALIVE_MS) {
            config.pool.keep_alive = Duration::from_millis(ms);
        }
        if let Some(bytes) = parse::<usize>(&lookup, ENV_STACK_SIZE) {
            config.pool.stack_size = Some(bytes);
        }
        config
    }

    pub fn with_lightweight(mut self, lightweight: bool) -> Self {
        self.lightweight = lightweight;
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }
}

impl PoolConfig {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_reclaim_grace(mut self, grace: Duration) -> Self {
        self.reclaim_grace = grace;
        self
    }

    pub fn with_thread_name(
        mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring malformed setting");
            None
        }
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring malformed setting");
            None
        }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        assert_eq!(Config::from_lookup(|_| None), Config::default());
    }

    #[test]
    fn reads_every_setting() {
        let config = Config::from_lookup(lookup(&[
            (ENV_LIGHTWEIGHT, "off"),
            (ENV_MAX_WORKERS, "8"),
            (ENV_KEEP_ALIVE_MS, "250"),
            (ENV_STACK_SIZE, "65536"),
        ]));
        assert!(!config.lightweight);
        assert_eq!(config.pool.max_workers, 8);
        assert_eq!(config.pool.keep_alive, Duration::from_millis(250));
        assert_eq!(config.pool.stack_size, Some(65536));
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[
            (ENV_LIGHTWEIGHT, "maybe"),
            (ENV_MAX_WORKERS, "0"),
            (ENV_KEEP_ALIVE_MS, "soon"),
        ]));
        assert_eq!(config, Config::default());
    }
}
