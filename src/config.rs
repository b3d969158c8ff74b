use anyhow::{anyhow, Error, Result};
use figment::{
    providers::{Env, Format, Toml, Yaml},
    Figment,
};
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

const DEFAULT_CONFIG_PATH: &str = "/etc/usersvc/config.toml";
const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SERVICE_NAME: &str = "usersvc";
const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 2000;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub log: Option<String>,
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub server: Server,
    pub otel: Option<Otel>,
    #[serde(default)]
    pub shutdown: Shutdown,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Service {
    #[serde(default = "service_name_default")]
    pub name: String,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            name: service_name_default(),
        }
    }
}

fn service_name_default() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct Server {
    #[serde(default = "addr_default")]
    pub addr: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            addr: addr_default(),
        }
    }
}

fn addr_default() -> String {
    DEFAULT_SERVER_ADDR.to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct Otel {
    pub endpoint: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Shutdown {
    /// Upper bound on total shutdown latency, in milliseconds.
    #[serde(default = "timeout_default")]
    pub timeout: u64,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self {
            timeout: timeout_default(),
        }
    }
}

fn timeout_default() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

impl Config {
    pub fn load(path: Option<PathBuf>) -> Result<Self, Error> {
        let path = path.unwrap_or(PathBuf::from(DEFAULT_CONFIG_PATH));
        let figment = Figment::new();
        let figment = match path.extension().and_then(OsStr::to_str) {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml") => figment.merge(Yaml::file(path)),
            Some(ext) => return Err(anyhow!("unexpected file extension '{}'", ext)),
            None => return Err(anyhow!("failed to parse path")),
        };

        let config: Config = figment
            .join(Env::prefixed("USERSVC_").split("_"))
            .extract()?;
        Ok(config)
    }

    pub fn log_level(&self) -> LevelFilter {
        match self
            .log
            .to_owned()
            .unwrap_or_else(|| "INFO".to_string())
            .to_uppercase()
            .as_str()
        {
            "TRACE" => LevelFilter::TRACE,
            "DEBUG" => LevelFilter::DEBUG,
            "ERROR" => LevelFilter::ERROR,
            "INFO" => LevelFilter::INFO,
            _ => LevelFilter::INFO,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown.timeout)
    }
}
