pub mod config;
pub mod trace;

use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use txprobe::progress::Progress;
use txprobe::store::memory::MemoryStore;
use txprobe::store::mongo::{redact_uri, MongoStore};
use txprobe::RunReport;

use crate::config::{ConfigLoad, EngineKind, DEFAULT_CONFIG_FILE};

/// Seeds two accounts and checks whether an uncommitted transactional write is
/// visible from another session.
#[derive(Parser, PartialEq)]
#[command(version, author, about)]
pub struct Args {
    #[clap(short, long, help = "Print resolved arguments and settings to stderr")]
    pub debug: bool,

    #[clap(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    /// Config file, extension optional. Missing files are ignored.
    pub config_path: PathBuf,

    #[clap(short = 'l', default_value = "info", long)]
    pub log_level: String,

    #[clap(short = 's', long = "set", value_name = "KEY=VALUE")]
    /// Override a setting, e.g. `--set uri=mongodb://db:27017`. Repeatable.
    pub overrides: Vec<String>,
}

// overrides may carry a connection string
impl Debug for Args {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let overrides: Vec<String> = self.overrides.iter().map(|o| redact_uri(o)).collect();
        f.debug_struct("Args")
            .field("debug", &self.debug)
            .field("config_path", &self.config_path)
            .field("log_level", &self.log_level)
            .field("overrides", &overrides)
            .finish()
    }
}

impl Args {
    /// Loads the settings named by the arguments and applies the overrides.
    pub fn load_config(&self) -> Result<ConfigLoad> {
        let file = self.config_path.to_string_lossy();
        let mut cfg = ConfigLoad::new(&file).with_context(|| format!("loading config '{}'", file))?;
        cfg.apply_overrides(&self.overrides)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Connects to the configured store and runs the probe, reporting through `progress`.
pub async fn execute<P: Progress>(cfg: &ConfigLoad, progress: &mut P) -> Result<RunReport> {
    let report = match cfg.get_engine()? {
        EngineKind::Mongodb => {
            let endpoint = cfg.to_endpoint();
            let store = MongoStore::connect(&endpoint)
                .await
                .with_context(|| format!("connecting to {}", endpoint.redacted_uri()))?;
            txprobe::run(&store, progress).await
        }
        EngineKind::Memory => {
            let store = MemoryStore::new();
            txprobe::run(&store, progress).await
        }
    }
    .context("running the probe")?;

    info!("run finished: {:?}", report);
    Ok(report)
}
