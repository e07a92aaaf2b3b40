use crate::domain::model::{Product, ProductId, Stock};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 唯讀的商品與庫存查詢
#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<Product>;
    async fn stock(&self, id: ProductId) -> Result<Stock>;
}

/// 同步的字串 key-value 儲存, 用於持久化購物車
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// 使用者提示訊息 (不回傳結果)
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn error(&self, message: &str) {
        (**self).error(message)
    }
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn storage_path(&self) -> &str;
    fn storage_key(&self) -> &str;
    fn request_timeout(&self) -> Option<Duration>;
    fn messages(&self) -> &Messages;
}

/// 操作失敗時透過 [`Notifier`] 顯示的文字
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Messages {
    pub out_of_stock: String,
    pub add_failed: String,
    pub remove_failed: String,
    pub update_failed: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            out_of_stock: "Requested quantity is out of stock".to_string(),
            add_failed: "Failed to add product".to_string(),
            remove_failed: "Failed to remove product".to_string(),
            update_failed: "Failed to update product amount".to_string(),
        }
    }
}
