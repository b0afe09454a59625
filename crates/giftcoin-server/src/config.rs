use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Server settings read from `GIFTCOIN_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// `0` disables the background sweep.
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host: lookup("GIFTCOIN_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "GIFTCOIN_PORT", 3000)?,
            db_path: lookup("GIFTCOIN_DB_PATH")
                .unwrap_or_else(|| "giftcoin.db".into())
                .into(),
            sweep_interval_secs: parse_or(&lookup, "GIFTCOIN_SWEEP_INTERVAL_SECS", 3600)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}
