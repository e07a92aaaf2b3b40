use crate::config::{DEFAULT_API_ENDPOINT, DEFAULT_STORAGE_PATH, MAX_TIMEOUT_SECONDS};
use crate::core::{ConfigProvider, Messages, DEFAULT_STORAGE_KEY};
use crate::utils::error::{CartError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub messages: Messages,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORAGE_PATH.to_string(),
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CartError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CartError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CART_ENDPOINT}), 未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CartError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 以命令列參數覆蓋檔案中的設定
    #[cfg(feature = "cli")]
    pub fn with_overrides(mut self, cli: &crate::config::CliConfig) -> Self {
        if let Some(endpoint) = &cli.api_endpoint {
            self.inventory.endpoint = endpoint.clone();
        }
        if let Some(path) = &cli.storage_path {
            self.storage.path = path.clone();
        }
        if let Some(key) = &cli.storage_key {
            self.storage.key = key.clone();
        }
        if cli.timeout_seconds.is_some() {
            self.inventory.timeout_seconds = cli.timeout_seconds;
        }
        self
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.inventory.endpoint
    }

    fn storage_path(&self) -> &str {
        &self.storage.path
    }

    fn storage_key(&self) -> &str {
        &self.storage.key
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.inventory.timeout_seconds.map(Duration::from_secs)
    }

    fn messages(&self) -> &Messages {
        &self.messages
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("inventory.endpoint", &self.inventory.endpoint)?;
        validate_path("storage.path", &self.storage.path)?;
        validate_non_empty_string("storage.key", &self.storage.key)?;
        if let Some(timeout) = self.inventory.timeout_seconds {
            validate_range("inventory.timeout_seconds", timeout, 1, MAX_TIMEOUT_SECONDS)?;
        }
        Ok(())
    }
}
