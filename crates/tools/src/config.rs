//! Project configuration for contract compilation, deployment and networks
//!
//! The configuration record is assembled once at startup and never mutated.
//! Values are resolved in priority order:
//!
//! 1. Environment variables (`PRIVATE_KEY`, `INFURA_API_KEY`, `CONTRACTKIT_*`)
//! 2. `contractkit.toml` profile file
//! 3. Built-in network defaults
//!
//! # Examples
//!
//! ```rust,no_run
//! use contractkit_tools::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let mainnet = config.network("mainnet")?;
//! println!("Chain ID: {}", mainnet.chain_id);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Raw hex private key, without the `0x` prefix
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
/// Infura project key embedded in hosted RPC URLs
pub const INFURA_API_KEY_ENV: &str = "INFURA_API_KEY";
/// Account strategy: `auto`, `private-key` or `mnemonic`
pub const ACCOUNTS_ENV: &str = "CONTRACTKIT_ACCOUNTS";
/// Overrides the default network
pub const NETWORK_ENV: &str = "CONTRACTKIT_NETWORK";
/// Path of the TOML profile file
pub const CONFIG_PATH_ENV: &str = "CONTRACTKIT_CONFIG";

pub const DEFAULT_CONFIG_FILE: &str = "contractkit.toml";

/// Well-known development mnemonic. Never use it on a production network.
pub const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";
pub const DEFAULT_HD_PATH: &str = "m/44'/60'/0'/0";
pub const DEFAULT_HD_COUNT: u32 = 20;

const GWEI: u64 = 1_000_000_000;
const REDACTED: &str = "[REDACTED]";
const LOCALHOST_NETWORK: &str = "localhost";

/// Hosted networks whose chain ID cannot be overridden
const FIXED_CHAIN_IDS: [(&str, u64); 2] = [("mainnet", 1), ("goerli", 5)];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid account strategy: {0}. Must be: auto, private-key, or mnemonic")]
    InvalidAccountStrategy(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// How the signing accounts of hosted networks are sourced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountStrategy {
    /// Private key when `PRIVATE_KEY` is set, test mnemonic otherwise
    #[default]
    Auto,
    /// Single account from `PRIVATE_KEY`
    PrivateKey,
    /// Accounts derived from the fixed test mnemonic
    Mnemonic,
}

impl AccountStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStrategy::Auto => "auto",
            AccountStrategy::PrivateKey => "private-key",
            AccountStrategy::Mnemonic => "mnemonic",
        }
    }

    /// Parse strategy from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(AccountStrategy::Auto),
            "private-key" | "private_key" | "pk" => Ok(AccountStrategy::PrivateKey),
            "mnemonic" | "hd" => Ok(AccountStrategy::Mnemonic),
            other => Err(ConfigError::InvalidAccountStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for AccountStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HD wallet account descriptor
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HdAccounts {
    pub mnemonic: String,
    pub path: String,
    pub initial_index: u32,
    pub count: u32,
}

impl HdAccounts {
    /// The first `DEFAULT_HD_COUNT` accounts of `mnemonic` on the default path
    pub fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            path: DEFAULT_HD_PATH.to_string(),
            initial_index: 0,
            count: DEFAULT_HD_COUNT,
        }
    }
}

impl fmt::Debug for HdAccounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdAccounts")
            .field("mnemonic", &REDACTED)
            .field("path", &self.path)
            .field("initial_index", &self.initial_index)
            .field("count", &self.count)
            .finish()
    }
}

/// Where a network's signing accounts come from
#[derive(Clone, PartialEq, Eq)]
pub enum AccountSource {
    /// Literal `0x`-prefixed private keys
    PrivateKeys(Vec<String>),
    /// Accounts derived from a mnemonic phrase
    Mnemonic(HdAccounts),
    /// Accounts unlocked on the node itself (`eth_accounts`)
    Remote,
}

impl AccountSource {
    /// True when the source cannot yield a single signer
    pub fn is_empty(&self) -> bool {
        match self {
            AccountSource::PrivateKeys(keys) => keys.iter().all(|k| k.trim().is_empty()),
            AccountSource::Mnemonic(hd) => hd.mnemonic.trim().is_empty() || hd.count == 0,
            AccountSource::Remote => false,
        }
    }

    /// Copy with key material masked
    pub fn redacted(&self) -> Self {
        match self {
            AccountSource::PrivateKeys(keys) => {
                AccountSource::PrivateKeys(keys.iter().map(|_| REDACTED.to_string()).collect())
            }
            AccountSource::Mnemonic(hd) => AccountSource::Mnemonic(HdAccounts {
                mnemonic: REDACTED.to_string(),
                ..hd.clone()
            }),
            AccountSource::Remote => AccountSource::Remote,
        }
    }

    /// Short human-readable description, free of secrets
    pub fn describe(&self) -> String {
        match self {
            AccountSource::PrivateKeys(keys) => match keys.len() {
                1 => "1 private key".to_string(),
                n => format!("{} private keys", n),
            },
            AccountSource::Mnemonic(hd) => format!(
                "mnemonic ({} accounts from {}/{})",
                hd.count, hd.path, hd.initial_index
            ),
            AccountSource::Remote => "remote (node accounts)".to_string(),
        }
    }
}

impl fmt::Debug for AccountSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountSource::PrivateKeys(keys) => f
                .debug_tuple("PrivateKeys")
                .field(&vec![REDACTED; keys.len()])
                .finish(),
            AccountSource::Mnemonic(hd) => f.debug_tuple("Mnemonic").field(hd).finish(),
            AccountSource::Remote => f.write_str("Remote"),
        }
    }
}

// Mirrors the exported object: a key list, an HD descriptor, or "remote"
impl Serialize for AccountSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            AccountSource::PrivateKeys(keys) => serializer.collect_seq(keys),
            AccountSource::Mnemonic(hd) => hd.serialize(serializer),
            AccountSource::Remote => serializer.serialize_str("remote"),
        }
    }
}

/// Connection descriptor for one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// RPC endpoint URL
    pub url: String,
    /// Signing account source
    pub accounts: AccountSource,
    /// Chain identifier
    pub chain_id: u64,
    /// Fixed gas price in wei
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolidityConfig {
    pub version: String,
    pub settings: CompilerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerSettings {
    pub optimizer: OptimizerSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

impl Default for SolidityConfig {
    fn default() -> Self {
        Self {
            version: "0.6.12".to_string(),
            settings: CompilerSettings {
                optimizer: OptimizerSettings {
                    enabled: true,
                    runs: 200,
                },
            },
        }
    }
}

/// Directories used by deployment scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathsConfig {
    pub deploy: String,
    pub deployments: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            deploy: "scripts".to_string(),
            deployments: "deployments".to_string(),
        }
    }
}

/// Test-runner options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MochaConfig {
    /// Timeout in milliseconds
    pub timeout: u64,
    pub enable_timeouts: bool,
}

impl Default for MochaConfig {
    fn default() -> Self {
        Self {
            timeout: 800_000,
            enable_timeouts: false,
        }
    }
}

/// Contract size analysis options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSizerConfig {
    pub alpha_sort: bool,
    pub run_on_compile: bool,
    pub disambiguate_paths: bool,
}

impl Default for ContractSizerConfig {
    fn default() -> Self {
        Self {
            alpha_sort: true,
            run_on_compile: true,
            disambiguate_paths: false,
        }
    }
}

/// Network profile from contractkit.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkProfile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub gas_price: Option<u64>,
}

/// Default profile section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultProfile {
    pub network: Option<String>,
}

/// Parsed contractkit.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileFile {
    #[serde(default)]
    pub default: Option<DefaultProfile>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkProfile>,
}

impl ProfileFile {
    /// Read a profile file. A missing file yields `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no profile file");
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let profiles = toml::from_str(&content)?;
        debug!(path = %path.display(), "loaded profile file");
        Ok(Some(profiles))
    }
}

/// Secret values that must never be printed
#[derive(Clone, Default, PartialEq, Eq)]
struct Secrets(Vec<String>);

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secrets({})", self.0.len())
    }
}

/// Resolved configuration record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Compiler version and optimizer settings
    pub solidity: SolidityConfig,
    /// Network descriptors keyed by name
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Network used when none is selected explicitly
    pub default_network: String,
    pub paths: PathsConfig,
    pub mocha: MochaConfig,
    pub contract_sizer: ContractSizerConfig,
    #[serde(skip)]
    secrets: Secrets,
}

impl Config {
    /// Load configuration from `.env`, the process environment and
    /// contractkit.toml
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The profile file named by `CONTRACTKIT_CONFIG` is missing or malformed
    /// - `CONTRACTKIT_ACCOUNTS` is not a known strategy
    /// - The private-key strategy is forced but `PRIVATE_KEY` is unset
    /// - The resulting configuration fails validation
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (non-fatal)
        let _ = dotenvy::dotenv();

        let explicit_path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|path| !path.trim().is_empty());

        let profiles = match explicit_path {
            Some(path) => {
                let path = PathBuf::from(path);
                match ProfileFile::load(&path)? {
                    Some(profiles) => Some(profiles),
                    None => {
                        return Err(ConfigError::Io(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            format!("profile file not found: {}", path.display()),
                        )))
                    }
                }
            }
            None => ProfileFile::load(Path::new(DEFAULT_CONFIG_FILE))?,
        };

        Self::from_lookup(|key| std::env::var(key).ok(), profiles.as_ref())
    }

    /// Assemble configuration from a variable lookup and optional profiles
    pub fn from_lookup<F>(lookup: F, profiles: Option<&ProfileFile>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let strategy = match env(ACCOUNTS_ENV) {
            Some(value) => AccountStrategy::from_str(&value)?,
            None => AccountStrategy::Auto,
        };
        let accounts = Self::resolve_accounts(strategy, env(PRIVATE_KEY_ENV).as_deref())?;

        let mut secrets = Vec::new();
        let api_key = match env(INFURA_API_KEY_ENV) {
            Some(key) => {
                secrets.push(key.clone());
                key
            }
            None => {
                warn!("{} is not set; hosted network URLs will be incomplete", INFURA_API_KEY_ENV);
                String::new()
            }
        };

        let mut networks = BTreeMap::new();
        networks.insert(
            "mainnet".to_string(),
            NetworkConfig {
                url: format!("https://mainnet.infura.io/v3/{}", api_key),
                accounts: accounts.clone(),
                chain_id: 1,
                gas_price: Some(120 * GWEI),
            },
        );
        networks.insert(
            "goerli".to_string(),
            NetworkConfig {
                url: format!("https://goerli.infura.io/v3/{}", api_key),
                accounts: accounts.clone(),
                chain_id: 5,
                gas_price: None,
            },
        );
        networks.insert(
            LOCALHOST_NETWORK.to_string(),
            NetworkConfig {
                url: "http://127.0.0.1:8545".to_string(),
                accounts: AccountSource::Remote,
                chain_id: 31337,
                gas_price: None,
            },
        );

        let mut default_network = LOCALHOST_NETWORK.to_string();
        if let Some(profiles) = profiles {
            Self::apply_profiles(&mut networks, profiles, &accounts)?;
            if let Some(name) = profiles.default.as_ref().and_then(|d| d.network.clone()) {
                default_network = name;
            }
        }
        if let Some(name) = env(NETWORK_ENV) {
            default_network = name;
        }

        let config = Config {
            solidity: SolidityConfig::default(),
            networks,
            default_network,
            paths: PathsConfig::default(),
            mocha: MochaConfig::default(),
            contract_sizer: ContractSizerConfig::default(),
            secrets: Secrets(secrets),
        };
        config.validate()?;

        debug!(
            strategy = %strategy,
            default_network = %config.default_network,
            networks = config.networks.len(),
            "configuration assembled"
        );
        Ok(config)
    }

    fn resolve_accounts(
        strategy: AccountStrategy,
        private_key: Option<&str>,
    ) -> Result<AccountSource, ConfigError> {
        let from_key = |key: &str| AccountSource::PrivateKeys(vec![format!("0x{}", key)]);
        let from_mnemonic = || AccountSource::Mnemonic(HdAccounts::new(TEST_MNEMONIC));

        match (strategy, private_key) {
            (AccountStrategy::PrivateKey, Some(key)) | (AccountStrategy::Auto, Some(key)) => {
                Ok(from_key(key))
            }
            (AccountStrategy::PrivateKey, None) => {
                Err(ConfigError::MissingEnv(PRIVATE_KEY_ENV.to_string()))
            }
            (AccountStrategy::Mnemonic, _) | (AccountStrategy::Auto, None) => Ok(from_mnemonic()),
        }
    }

    fn apply_profiles(
        networks: &mut BTreeMap<String, NetworkConfig>,
        profiles: &ProfileFile,
        accounts: &AccountSource,
    ) -> Result<(), ConfigError> {
        for (name, profile) in &profiles.networks {
            match networks.get_mut(name) {
                Some(network) => {
                    if let Some(url) = &profile.url {
                        network.url = url.clone();
                    }
                    if let Some(chain_id) = profile.chain_id {
                        let fixed = FIXED_CHAIN_IDS
                            .iter()
                            .find(|(fixed_name, _)| *fixed_name == name.as_str());
                        if let Some((_, fixed_id)) = fixed {
                            if chain_id != *fixed_id {
                                return Err(ConfigError::ValidationError(format!(
                                    "network '{}': chain ID is fixed at {} and cannot be set to {}",
                                    name, fixed_id, chain_id
                                )));
                            }
                        }
                        network.chain_id = chain_id;
                    }
                    if profile.gas_price.is_some() {
                        network.gas_price = profile.gas_price;
                    }
                }
                None => {
                    let url = profile
                        .url
                        .clone()
                        .ok_or_else(|| ConfigError::MissingField(format!("networks.{}.url", name)))?;
                    let chain_id = profile.chain_id.ok_or_else(|| {
                        ConfigError::MissingField(format!("networks.{}.chain_id", name))
                    })?;
                    networks.insert(
                        name.clone(),
                        NetworkConfig {
                            url,
                            accounts: accounts.clone(),
                            chain_id,
                            gas_price: profile.gas_price,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        let mut chain_ids = HashSet::new();
        for (name, network) in &self.networks {
            if !network.url.starts_with("http://") && !network.url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "network '{}': RPC URL must start with http:// or https://",
                    name
                )));
            }
            if network.accounts.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "network '{}': account source is empty",
                    name
                )));
            }
            if !chain_ids.insert(network.chain_id) {
                return Err(ConfigError::ValidationError(format!(
                    "network '{}': chain ID {} is already used by another network",
                    name, network.chain_id
                )));
            }
        }

        if !self.networks.contains_key(&self.default_network) {
            return Err(ConfigError::UnknownNetwork(self.default_network.clone()));
        }

        Ok(())
    }

    /// Look up a network by name
    pub fn network(&self, name: &str) -> Result<&NetworkConfig, ConfigError> {
        self.networks
            .get(name)
            .ok_or_else(|| ConfigError::UnknownNetwork(name.to_string()))
    }

    /// Copy with private keys, mnemonics and API keys masked
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for network in config.networks.values_mut() {
            network.accounts = network.accounts.redacted();
            for secret in &self.secrets.0 {
                // Only the trailing key segment is secret
                if let Some(prefix) = network.url.strip_suffix(secret.as_str()) {
                    if prefix.ends_with('/') {
                        network.url = format!("{}{}", prefix, REDACTED);
                    }
                }
            }
        }
        config
    }

    /// Get the redacted configuration as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.redacted())
    }

    /// Print the resolved configuration
    pub fn print_summary(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let redacted = self.redacted();
        let optimizer = &redacted.solidity.settings.optimizer;

        writeln!(out, "╔════════════════════════════════════════════════════════════════╗")?;
        writeln!(out, "║              CONTRACTKIT CONFIGURATION RESOLVED                ║")?;
        writeln!(out, "╚════════════════════════════════════════════════════════════════╝")?;
        writeln!(out, "  Solidity:            {}", redacted.solidity.version)?;
        if optimizer.enabled {
            writeln!(out, "  Optimizer:           enabled ({} runs)", optimizer.runs)?;
        } else {
            writeln!(out, "  Optimizer:           disabled")?;
        }
        writeln!(out, "  Default Network:     {}", redacted.default_network)?;

        for (name, network) in &redacted.networks {
            writeln!(out, "  [{}]", name)?;
            writeln!(out, "    RPC URL:           {}", network.url)?;
            writeln!(out, "    Chain ID:          {}", network.chain_id)?;
            writeln!(out, "    Accounts:          {}", network.accounts.describe())?;
            match network.gas_price {
                Some(price) => writeln!(out, "    Gas Price:         {} wei", price)?,
                None => writeln!(out, "    Gas Price:         auto")?,
            }
        }

        writeln!(out, "  Deploy Scripts:      {}", redacted.paths.deploy)?;
        writeln!(out, "  Deployments:         {}", redacted.paths.deployments)?;
        writeln!(out, "  Test Timeout:        {}ms", redacted.mocha.timeout)?;
        writeln!(out, "╚════════════════════════════════════════════════════════════════╝")?;
        Ok(())
    }
}
