// 適配器層: 外部介面的具體實作

pub mod http;
pub mod notifier;
pub mod storage;

pub use http::HttpInventory;
pub use notifier::{ConsoleNotifier, MemoryNotifier, TracingNotifier};
pub use storage::{FileStore, MemoryStore};
