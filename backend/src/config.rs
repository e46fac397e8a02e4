use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATA_FILE: &str = "wheeloffortune.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_file: PathBuf,
    /// Where deferred host actions are POSTed. Without it they wait in the
    /// chat's outbox.
    pub host_callback_url: Option<String>,
    /// Local hour of the nightly wheel rebuild.
    pub nightly_hour: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            host_callback_url: None,
            nightly_hour: 0,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let bind_addr = lookup("WHEEL_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("WHEEL_BIND_ADDR: {}", e)))?;

        let data_file = lookup("WHEEL_DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

        let host_callback_url = lookup("WHEEL_HOST_CALLBACK_URL").filter(|url| !url.trim().is_empty());

        let nightly_hour = match lookup("WHEEL_NIGHTLY_HOUR") {
            Some(hour) => hour
                .parse::<u32>()
                .ok()
                .filter(|h| *h < 24)
                .ok_or_else(|| Error::Config(format!("WHEEL_NIGHTLY_HOUR must be 0-23, got '{}'", hour)))?,
            None => 0,
        };

        Ok(Self {
            bind_addr,
            data_file,
            host_callback_url,
            nightly_hour,
        })
    }
}
