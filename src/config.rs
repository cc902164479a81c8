use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ADDR: &str = "127.0.0.1:37241";
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const DEFAULT_ROLLOVER_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set in the environment or .env file")]
    MissingDatabaseUrl,

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Server settings, read from the environment after loading `.env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub addr: SocketAddr,
    pub pool_size: u32,
    pub rollover_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;
        let addr = parse_or(&lookup, "DAYBOOK_ADDR", DEFAULT_ADDR.parse().ok())?;
        let pool_size = parse_or(&lookup, "DAYBOOK_POOL_SIZE", Some(DEFAULT_POOL_SIZE))?;
        let rollover_secs =
            parse_or(&lookup, "DAYBOOK_ROLLOVER_SECS", Some(DEFAULT_ROLLOVER_SECS))?;

        Ok(Config {
            database_url,
            addr,
            pool_size,
            rollover_interval: Duration::from_secs(rollover_secs.max(1)),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => default.ok_or(ConfigError::Invalid {
            name,
            value: String::new(),
        }),
    }
}
