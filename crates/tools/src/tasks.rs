//! Named console tasks.
//!
//! A [`TaskRegistry`] maps task names to [`Task`] implementations. The CLI
//! looks tasks up by name and runs them with a [`TaskContext`] carrying the
//! loaded configuration, a chain provider and the output sink.
//!
//! # Example
//!
//! ```ignore
//! let registry = TaskRegistry::with_builtin_tasks();
//! let mut ctx = TaskContext { config: &config, network: "localhost", provider: &provider, out: &mut out };
//! registry.run("blockNumber", &mut ctx).await?;
//! ```

use async_trait::async_trait;
use ethers::utils::to_checksum;
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::provider::{ChainProvider, ProviderError};

pub const ACCOUNTS_TASK: &str = "accounts";
pub const BLOCK_NUMBER_TASK: &str = "blockNumber";

/// Errors surfaced by the task runner
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to write task output: {0}")]
    Output(#[from] std::io::Error),
}

/// Everything a task may touch while running
pub struct TaskContext<'a> {
    /// Loaded configuration, read-only
    pub config: &'a Config,
    /// Name of the network the provider is bound to
    pub network: &'a str,
    pub provider: &'a dyn ChainProvider,
    /// Console output
    pub out: &'a mut (dyn Write + Send),
}

/// A named command runnable from the CLI
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    /// One-line help text
    fn description(&self) -> &str;

    async fn run(&self, ctx: &mut TaskContext<'_>) -> Result<(), TaskError>;
}

/// Prints the address of every available signer, one per line
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountsTask;

#[async_trait]
impl Task for AccountsTask {
    fn name(&self) -> &str {
        ACCOUNTS_TASK
    }

    fn description(&self) -> &str {
        "Prints the list of accounts"
    }

    async fn run(&self, ctx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        let addresses = ctx.provider.signer_addresses().await?;
        debug!(network = ctx.network, count = addresses.len(), "fetched signer addresses");

        for address in &addresses {
            writeln!(ctx.out, "{}", to_checksum(address, None))?;
        }
        Ok(())
    }
}

/// Prints the current block height
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockNumberTask;

#[async_trait]
impl Task for BlockNumberTask {
    fn name(&self) -> &str {
        BLOCK_NUMBER_TASK
    }

    fn description(&self) -> &str {
        "Prints the current block number"
    }

    async fn run(&self, ctx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        let block_number = ctx.provider.block_number().await?;
        writeln!(ctx.out, "Current block number: {}", block_number)?;
        Ok(())
    }
}

/// Registry of runnable tasks, keyed by name
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Box<dyn Task>>,
}

impl TaskRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `accounts` and `blockNumber`
    pub fn with_builtin_tasks() -> Self {
        let mut registry = Self::new();
        registry.register(AccountsTask);
        registry.register(BlockNumberTask);
        registry
    }

    /// Register a task under its own name, replacing any previous one
    pub fn register<T>(&mut self, task: T)
    where
        T: Task + 'static,
    {
        self.tasks.insert(task.name().to_string(), Box::new(task));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Task> {
        self.tasks.get(name).map(|task| task.as_ref())
    }

    /// Registered tasks sorted by name
    pub fn list(&self) -> Vec<&dyn Task> {
        let mut tasks: Vec<&dyn Task> = self.tasks.values().map(|task| task.as_ref()).collect();
        tasks.sort_by(|a, b| a.name().cmp(b.name()));
        tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run the task registered as `name`
    ///
    /// Failures from the task are returned unchanged. Nothing is retried.
    pub async fn run(&self, name: &str, ctx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        let task = self
            .get(name)
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;
        info!(task = name, network = ctx.network, "running task");
        task.run(ctx).await
    }
}
