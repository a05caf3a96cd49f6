//! ContractKit Tools Library
//!
//! Provides project configuration, chain access and console tasks for
//! smart contract development.

pub mod config;
pub mod provider;
pub mod tasks;

pub use config::{AccountSource, Config, ConfigError, NetworkConfig};
pub use provider::{ChainProvider, ProviderError, RpcChainProvider};
pub use tasks::{Task, TaskContext, TaskError, TaskRegistry};
