use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_derive::{Deserialize, Serialize};
use txprobe::store::mongo::{
    redact_uri, Endpoint, DEFAULT_APP_NAME, DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_URI,
};

/// Prefix of the environment variables read by [`ConfigLoad::new`], e.g. `TXPROBE_URI`.
pub const ENV_PREFIX: &str = "TXPROBE";
pub const DEFAULT_CONFIG_FILE: &str = "txprobe";
const DEFAULT_SERVER_SELECTION_TIMEOUT_MS: u64 = 30_000;

/// Which store the probe runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    /// A MongoDB deployment reached through `uri`.
    Mongodb,
    /// The in-process store, no server needed.
    Memory,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(EngineKind::Mongodb),
            "memory" => Ok(EngineKind::Memory),
            _ => Err(format!("expected one of mongodb, memory; got '{}'", s)),
        }
    }
}

impl Display for EngineKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Mongodb => write!(f, "mongodb"),
            EngineKind::Memory => write!(f, "memory"),
        }
    }
}

/// load configration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigLoad {
    version: u8,

    /// connection string, default 'mongodb://localhost:27017'
    pub uri: String,

    /// default 'testdb'
    pub database: String,

    /// default 'accounts'. Emptied on every run.
    pub collection: String,

    pub app_name: String,

    /// Used unless the connection string sets serverSelectionTimeoutMS.
    pub server_selection_timeout_ms: u64,

    /// 'mongodb' or 'memory', default 'mongodb'
    engine: String,
}

impl Default for ConfigLoad {
    fn default() -> Self {
        ConfigLoad {
            version: 1,
            uri: DEFAULT_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            server_selection_timeout_ms: DEFAULT_SERVER_SELECTION_TIMEOUT_MS,
            engine: EngineKind::Mongodb.to_string(),
        }
    }
}

impl std::fmt::Debug for ConfigLoad {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoad")
            .field("version", &self.version)
            .field("uri", &redact_uri(&self.uri))
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("app_name", &self.app_name)
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .field("engine", &self.engine)
            .finish()
    }
}

impl ConfigLoad {
    /// Defaults, overlaid by `file` (any format the `config` crate detects,
    /// optional), overlaid by `TXPROBE_*` environment variables.
    pub fn new(file: &str) -> Result<Self> {
        let df = ConfigLoad::default();

        Ok(config::Config::builder()
            .set_default("version", df.version as i64)?
            .set_default("uri", df.uri)?
            .set_default("database", df.database)?
            .set_default("collection", df.collection)?
            .set_default("app_name", df.app_name)?
            .set_default("server_selection_timeout_ms", df.server_selection_timeout_ms as i64)?
            .set_default("engine", df.engine)?
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?)
    }

    pub fn get_engine(&self) -> Result<EngineKind> {
        self.engine
            .parse()
            .map_err(|e| anyhow!("Invalid engine '{}': {}", self.engine, e))
    }

    pub fn set_engine(&mut self, engine: EngineKind) {
        self.engine = engine.to_string();
    }

    pub fn get_server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint {
            uri: self.uri.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
            app_name: self.app_name.clone(),
            server_selection_timeout: self.get_server_selection_timeout(),
        }
    }

    /// change cmd:
    /// uri、database、collection、app_name、server_selection_timeout_ms、engine
    pub fn inject_cmd(&mut self, cmd_name: &str, cmd_value: &str) -> Result<()> {
        match cmd_name {
            "uri" => self.uri = cmd_value.to_string(),
            "database" => self.database = cmd_value.to_string(),
            "collection" => self.collection = cmd_value.to_string(),
            "app_name" => self.app_name = cmd_value.to_string(),
            "server_selection_timeout_ms" => {
                self.server_selection_timeout_ms = cmd_value
                    .parse()
                    .map_err(|e| anyhow!("Invalid timeout '{}': {}", cmd_value, e))?;
            }
            "engine" => {
                let engine: EngineKind = cmd_value
                    .parse()
                    .map_err(|e| anyhow!("Invalid engine '{}': {}", cmd_value, e))?;
                self.set_engine(engine);
            }
            _ => return Err(anyhow!("Unknown setting: {}", cmd_name)),
        }
        Ok(())
    }

    /// Applies `key=value` overrides in order.
    pub fn apply_overrides(&mut self, overrides: &[String]) -> Result<()> {
        for item in overrides {
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| anyhow!("Override '{}' must be of the form key=value", item))?;
            self.inject_cmd(key.trim(), value.trim())?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let engine = self.get_engine()?;
        self.to_endpoint()
            .validate()
            .map_err(|e| anyhow!("{} (engine {})", e, engine))?;
        Ok(())
    }
}
