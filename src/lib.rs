pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CartCommand, CliConfig};

pub use adapters::{ConsoleNotifier, FileStore, HttpInventory, MemoryNotifier, MemoryStore, TracingNotifier};
pub use app::open_store;
pub use config::TomlConfig;
pub use self::core::{Cart, CartLine, CartStore, Change, Product, ProductId, Stock, UpdateProductAmount};
pub use utils::error::{CartError, Result};
