pub mod cart_store;

pub use crate::domain::model::{Cart, CartLine, Product, ProductId, Stock, UpdateProductAmount};
pub use crate::domain::ports::{ConfigProvider, InventoryService, Messages, Notifier, PersistentStore};
pub use crate::utils::error::Result;
pub use cart_store::{CartStore, Change, DEFAULT_STORAGE_KEY};
