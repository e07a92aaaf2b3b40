#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:3333";
pub const DEFAULT_STORAGE_PATH: &str = "./cart";
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

#[cfg(feature = "cli")]
pub use cli::{CartCommand, CliConfig};
pub use toml_config::TomlConfig;
