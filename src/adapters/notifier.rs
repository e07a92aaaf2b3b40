use crate::core::Notifier;
use std::sync::{Arc, Mutex};

/// 以 `warn` 日誌輸出訊息
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// 將訊息印到 stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }
}

/// 記錄訊息; clone 共用同一份紀錄
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn error(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
