//! Chain access used by tasks
//!
//! Tasks never talk to a node directly. They receive a [`ChainProvider`],
//! which exposes exactly the two queries they need. [`RpcChainProvider`] is
//! the JSON-RPC implementation. Tests substitute their own.

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError as RpcError};
use ethers::signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer, WalletError};
use ethers::types::Address;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::config::{AccountSource, HdAccounts, NetworkConfig};

/// Errors raised while building or querying a provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("RPC request failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("Signer error: {0}")]
    Signer(#[from] WalletError),

    #[error("Invalid RPC URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Capability handed to tasks
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Addresses of the available signing accounts, in configuration order
    async fn signer_addresses(&self) -> Result<Vec<Address>, ProviderError>;

    /// Current block height
    async fn block_number(&self) -> Result<u64, ProviderError>;
}

/// JSON-RPC provider with local signers for one network
pub struct RpcChainProvider {
    provider: Provider<Http>,
    signers: Vec<LocalWallet>,
}

impl fmt::Debug for RpcChainProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChainProvider")
            .field("url", &self.provider.url().as_str())
            .field("signers", &self.signers.len())
            .finish()
    }
}

impl RpcChainProvider {
    /// Build a provider for `network`
    ///
    /// No request is made here. Signers are constructed eagerly, so a
    /// malformed private key or mnemonic fails now rather than at first use.
    pub fn connect(network: &NetworkConfig) -> Result<Self, ProviderError> {
        let provider =
            Provider::<Http>::try_from(network.url.as_str()).map_err(|e| ProviderError::InvalidUrl {
                url: network.url.clone(),
                reason: e.to_string(),
            })?;

        let signers = match &network.accounts {
            AccountSource::PrivateKeys(keys) => keys
                .iter()
                .map(|key| -> Result<LocalWallet, ProviderError> {
                    Ok(key.parse::<LocalWallet>()?.with_chain_id(network.chain_id))
                })
                .collect::<Result<Vec<_>, _>>()?,
            AccountSource::Mnemonic(hd) => derive_wallets(hd, network.chain_id)?,
            AccountSource::Remote => Vec::new(),
        };

        debug!(
            chain_id = network.chain_id,
            signers = signers.len(),
            "provider ready"
        );
        Ok(Self { provider, signers })
    }
}

/// Derive `hd.count` wallets starting at `hd.initial_index`
pub fn derive_wallets(hd: &HdAccounts, chain_id: u64) -> Result<Vec<LocalWallet>, ProviderError> {
    let end = hd.initial_index.saturating_add(hd.count);
    (hd.initial_index..end)
        .map(|index| -> Result<LocalWallet, ProviderError> {
            let wallet = MnemonicBuilder::<English>::default()
                .phrase(hd.mnemonic.as_str())
                .derivation_path(&format!("{}/{}", hd.path, index))?
                .build()?;
            Ok(wallet.with_chain_id(chain_id))
        })
        .collect()
}

#[async_trait]
impl ChainProvider for RpcChainProvider {
    async fn signer_addresses(&self) -> Result<Vec<Address>, ProviderError> {
        if self.signers.is_empty() {
            return Ok(self.provider.get_accounts().await?);
        }
        Ok(self.signers.iter().map(|signer| signer.address()).collect())
    }

    async fn block_number(&self) -> Result<u64, ProviderError> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }
}
