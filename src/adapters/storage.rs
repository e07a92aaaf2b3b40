use crate::core::PersistentStore;
use crate::utils::error::{CartError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 每個 key 在 `base_path` 下存成一個 JSON 檔
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// 每個 key 對應唯一檔名: 英數字、`-` 與 `.` 保留, 其餘位元組 (含 `_`)
    /// 編碼為 `_XX`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut file_name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
                file_name.push(char::from(byte));
            } else {
                file_name.push_str(&format!("_{:02X}", byte));
            }
        }
        self.base_path.join(format!("{}.json", file_name))
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CartError::IoError(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let full_path = self.path_for(key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // 先寫暫存檔再改名, 避免留下寫一半的檔案
        let tmp_path = tmp_path_for(&full_path);
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &full_path)?;
        tracing::debug!("Persisted {} bytes to {}", value.len(), full_path.display());
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// 記憶體儲存; clone 共用同一份資料
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }

    /// 成功 `set` 的次數
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|e| CartError::StorageError {
            message: e.to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|e| CartError::StorageError {
            message: e.to_string(),
        })?;
        entries.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
