use crate::core::{ChainParams, SyncPolicy};
use crate::error::{BlockchainError, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

static DEFAULT_NODE_ADDR: &str = "127.0.0.1:2001";
static DEFAULT_CONFIG_FILE: &str = "mewchain.toml";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const SEEDS_KEY: &str = "MEWCHAIN_SEEDS";
const DATA_DIR_KEY: &str = "MEWCHAIN_DATA_DIR";
const CONFIG_PATH_KEY: &str = "MEWCHAIN_CONFIG";

/// Everything a node or light client needs to run.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file,
/// environment variables, command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub listen_addr: String,
    pub seeds: Vec<String>,
    pub data_dir: PathBuf,
    pub wallet: String,
    pub mining_interval_secs: u64,
    pub status_interval_secs: u64,
    pub max_connections: usize,
    pub broadcast_timeout_secs: u64,
    pub balance_timeout_secs: u64,
    /// Verify peers' chains and blocks before taking them
    pub strict_sync: bool,
    pub chain: ChainParams,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_NODE_ADDR.to_string(),
            seeds: Vec::new(),
            data_dir: PathBuf::from("."),
            wallet: crate::wallet::DEFAULT_WALLET_NAME.to_string(),
            mining_interval_secs: 100,
            status_interval_secs: 300,
            max_connections: 8,
            broadcast_timeout_secs: 30,
            balance_timeout_secs: 60,
            strict_sync: true,
            chain: ChainParams::default(),
        }
    }
}

impl NodeSettings {
    pub fn from_toml_str(contents: &str) -> Result<NodeSettings> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<NodeSettings> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// File named by `MEWCHAIN_CONFIG` (must exist), else `mewchain.toml` if
    /// present, else defaults; then environment overrides.
    pub fn load() -> Result<NodeSettings> {
        let mut settings = match env::var(CONFIG_PATH_KEY) {
            Ok(path) => Self::from_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => NodeSettings::default(),
        };
        settings.apply_overrides(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Apply `NODE_ADDRESS`, `MEWCHAIN_SEEDS` and `MEWCHAIN_DATA_DIR` from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(NODE_ADDRESS_KEY) {
            self.listen_addr = addr;
        }
        if let Some(seeds) = lookup(SEEDS_KEY) {
            self.seeds = seeds
                .split(',')
                .map(str::trim)
                .filter(|seed| !seed.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(dir) = lookup(DATA_DIR_KEY) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        if self.strict_sync {
            SyncPolicy::Verifying
        } else {
            SyncPolicy::Trusting
        }
    }

    pub fn mining_interval(&self) -> Duration {
        Duration::from_secs(self.mining_interval_secs)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn broadcast_timeout(&self) -> Duration {
        Duration::from_secs(self.broadcast_timeout_secs)
    }

    pub fn balance_timeout(&self) -> Duration {
        Duration::from_secs(self.balance_timeout_secs)
    }
}

/// Process-wide settings, adjusted by the CLI before the node starts
pub struct Config {
    inner: RwLock<NodeSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        let settings = match NodeSettings::load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring configuration file: {e}");
                let mut settings = NodeSettings::default();
                settings.apply_overrides(|key| env::var(key).ok());
                settings
            }
        };
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: NodeSettings) -> Config {
        Config {
            inner: RwLock::new(settings),
        }
    }

    /// Snapshot of the current settings
    pub fn get_settings(&self) -> NodeSettings {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<F: FnOnce(&mut NodeSettings)>(&self, change: F) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut inner);
    }

    pub fn get_node_addr(&self) -> String {
        self.get_settings().listen_addr
    }

    pub fn set_node_addr(&self, addr: String) {
        info!("Node address set to {addr}");
        self.update(|settings| settings.listen_addr = addr);
    }

    pub fn get_data_dir(&self) -> PathBuf {
        self.get_settings().data_dir
    }

    pub fn set_data_dir(&self, dir: PathBuf) {
        self.update(|settings| settings.data_dir = dir);
    }

    pub fn get_wallet_name(&self) -> String {
        self.get_settings().wallet
    }

    pub fn set_wallet_name(&self, name: String) {
        self.update(|settings| settings.wallet = name);
    }

    pub fn get_seeds(&self) -> Vec<String> {
        self.get_settings().seeds
    }

    pub fn add_seed(&self, seed: String) {
        self.update(|settings| {
            if !settings.seeds.contains(&seed) {
                settings.seeds.push(seed);
            }
        });
    }

    pub fn is_strict_sync(&self) -> bool {
        self.get_settings().strict_sync
    }
}
