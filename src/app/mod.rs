use crate::adapters::{FileStore, HttpInventory};
use crate::core::{CartStore, ConfigProvider, Notifier};
use crate::utils::error::Result;

pub type AppCartStore<N> = CartStore<HttpInventory, FileStore, N>;

/// 建立 HTTP 庫存服務 + 本地檔案儲存的購物車, 並載入設定 key 下已存的內容
pub fn open_store<N: Notifier>(config: &dyn ConfigProvider, notifier: N) -> Result<AppCartStore<N>> {
    tracing::debug!(
        "Opening cart store (endpoint: {}, storage: {}, key: {})",
        config.api_endpoint(),
        config.storage_path(),
        config.storage_key()
    );

    let inventory = HttpInventory::with_timeout(config.api_endpoint(), config.request_timeout())?;
    let storage = FileStore::new(config.storage_path());

    let store = CartStore::open_with_key(inventory, storage, notifier, config.storage_key())?
        .with_messages(config.messages().clone());
    Ok(store)
}
