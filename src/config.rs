use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DataSourceKind {
    Memory,
    Mongo,
}

impl FromStr for DataSourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<DataSourceKind, ()> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(DataSourceKind::Memory),
            "mongo" | "mongodb" => Ok(DataSourceKind::Mongo),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub bind_address: String,
    pub data_source: DataSourceKind,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub seed: bool,
    pub cache_dir: PathBuf,
    pub latency: Duration,
    pub failure_rate: f64,
}

impl Default for AppConfig {
    fn default() -> AppConfig {
        AppConfig {
            bind_address: "127.0.0.1:8080".to_string(),
            data_source: DataSourceKind::Memory,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "waqt_lkhair".to_string(),
            seed: true,
            cache_dir: PathBuf::from(".waqt_cache"),
            latency: Duration::from_millis(0),
            failure_rate: 0.0,
        }
    }
}

impl AppConfig {
    /// Reads the `WAQT_*` variables, after loading `.env` if there is one.
    /// Unset variables keep their default.
    pub fn from_env() -> Result<AppConfig, Error> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("loaded environment from {}", path.display());
        }

        AppConfig::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<AppConfig, Error> {
        let mut config = AppConfig::default();

        if let Some(value) = var("WAQT_BIND_ADDRESS") {
            config.bind_address = value;
        }
        if let Some(value) = var("WAQT_DATA_SOURCE") {
            config.data_source = parse("WAQT_DATA_SOURCE", value)?;
        }
        if let Some(value) = var("WAQT_MONGO_URI") {
            config.mongo_uri = value;
        }
        if let Some(value) = var("WAQT_MONGO_DATABASE") {
            config.mongo_database = value;
        }
        if let Some(value) = var("WAQT_SEED") {
            config.seed = parse("WAQT_SEED", value)?;
        }
        if let Some(value) = var("WAQT_CACHE_DIR") {
            config.cache_dir = PathBuf::from(value);
        }
        if let Some(value) = var("WAQT_LATENCY_MS") {
            config.latency = Duration::from_millis(parse("WAQT_LATENCY_MS", value)?);
        }
        if let Some(value) = var("WAQT_FAILURE_RATE") {
            let failure_rate: f64 = parse("WAQT_FAILURE_RATE", value.clone())?;
            if !(0.0..=1.0).contains(&failure_rate) {
                return Err(Error::InvalidConfiguration {
                    key: "WAQT_FAILURE_RATE".to_string(),
                    value,
                });
            }
            config.failure_rate = failure_rate;
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: String) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::InvalidConfiguration {
        key: key.to_string(),
        value,
    })
}
