use std::{env, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_ARCHIVE_INTERVAL_SECS: u64 = 3600;

/// Server settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub cache_ttl: Duration,
    /// `None` disables the periodic archive job.
    pub archive_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from("data/gmv.json"),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            archive_interval: Some(Duration::from_secs(DEFAULT_ARCHIVE_INTERVAL_SECS)),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);
        let data_path = env::var("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);
        let cache_ttl = env_parse("CACHE_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);
        let archive_interval = match env_parse::<u64>("ARCHIVE_INTERVAL_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.archive_interval,
        };

        Self {
            port,
            data_path,
            cache_ttl,
            archive_interval,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}
