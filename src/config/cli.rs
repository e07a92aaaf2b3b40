use crate::config::{DEFAULT_API_ENDPOINT, DEFAULT_STORAGE_PATH, MAX_TIMEOUT_SECONDS};
use crate::core::{ConfigProvider, Messages, DEFAULT_STORAGE_KEY};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "cart-store")]
#[command(about = "Manage a persistent shopping cart backed by an inventory service")]
pub struct CliConfig {
    /// Path to a TOML configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<String>,

    /// Base URL of the inventory service
    #[arg(long)]
    pub api_endpoint: Option<String>,

    /// Directory holding the persisted cart
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Key the cart is stored under
    #[arg(long)]
    pub storage_key: Option<String>,

    /// Inventory request timeout; requests wait indefinitely when unset
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(skip)]
    pub messages: Messages,

    #[command(subcommand)]
    pub command: CartCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CartCommand {
    /// Print the current cart
    Show,
    /// Add one unit of a product
    Add { product_id: u64 },
    /// Remove a product from the cart
    Remove { product_id: u64 },
    /// Set the quantity of a product already in the cart
    Update {
        product_id: u64,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
}

impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        self.api_endpoint.as_deref().unwrap_or(DEFAULT_API_ENDPOINT)
    }

    fn storage_path(&self) -> &str {
        self.storage_path.as_deref().unwrap_or(DEFAULT_STORAGE_PATH)
    }

    fn storage_key(&self) -> &str {
        self.storage_key.as_deref().unwrap_or(DEFAULT_STORAGE_KEY)
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    fn messages(&self) -> &Messages {
        &self.messages
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_endpoint", self.api_endpoint())?;
        validate_path("storage_path", self.storage_path())?;
        validate_non_empty_string("storage_key", self.storage_key())?;
        if let Some(timeout) = self.timeout_seconds {
            validate_range("timeout_seconds", timeout, 1, MAX_TIMEOUT_SECONDS)?;
        }
        Ok(())
    }
}
