use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

/// 客戶端本地存儲錯誤
#[derive(Debug, Error)]
pub enum ClientStoreError {
    /// IO 錯誤
    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化錯誤
    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 客戶端本地存儲結果類型別名
pub type ClientStoreResult<T> = Result<T, ClientStoreError>;

/// 客戶端本地存儲的鍵名
pub mod keys {
    /// 重定向授權的待定連接標記
    pub const PENDING_CONNECTION: &str = "pending_connection";
    /// 持久化的錢包會話
    pub const WALLET_SESSION: &str = "wallet_session";
    /// 重定向式鏈上寫入的待定執行標記
    pub const PENDING_EXECUTION: &str = "pending_execution";
}

/// 客戶端本地鍵值存儲特徵
///
/// 存放需要跨整頁導航存活的小型狀態：待定標記與錢包會話。
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// 讀取鍵對應的值
    async fn get(&self, key: &str) -> ClientStoreResult<Option<serde_json::Value>>;

    /// 寫入鍵值
    async fn put(&self, key: &str, value: serde_json::Value) -> ClientStoreResult<()>;

    /// 移除鍵，鍵不存在時為無操作
    async fn remove(&self, key: &str) -> ClientStoreResult<()>;
}

/// 讀取並反序列化指定鍵的值
pub async fn read_value<T: DeserializeOwned>(
    store: &dyn ClientStore,
    key: &str,
) -> ClientStoreResult<Option<T>> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// 序列化並寫入指定鍵的值
pub async fn write_value<T: Serialize>(
    store: &dyn ClientStore,
    key: &str,
    value: &T,
) -> ClientStoreResult<()> {
    store.put(key, serde_json::to_value(value)?).await
}

/// JSON 文件客戶端存儲實現
///
/// 所有鍵存放於單一 JSON 對象文件，寫入採取先寫臨時文件再改名的方式。
pub struct JsonFileClientStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileClientStore {
    /// 創建新的 JSON 文件客戶端存儲
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    async fn load_map(&self) -> ClientStoreResult<HashMap<String, serde_json::Value>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    async fn persist_map(&self, map: &HashMap<String, serde_json::Value>) -> ClientStoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(map)?;
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        fs::write(&temp, content.as_bytes()).await?;
        fs::rename(&temp, &self.path).await?;

        Ok(())
    }
}

#[async_trait]
impl ClientStore for JsonFileClientStore {
    async fn get(&self, key: &str) -> ClientStoreResult<Option<serde_json::Value>> {
        let map = self.load_map().await?;
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> ClientStoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load_map().await?;
        map.insert(key.to_string(), value);
        self.persist_map(&map).await
    }

    async fn remove(&self, key: &str) -> ClientStoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load_map().await?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.persist_map(&map).await
    }
}

/// 內存客戶端存儲實現，用於測試
#[derive(Default)]
pub struct InMemoryClientStore {
    map: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryClientStore {
    /// 創建新的內存客戶端存儲
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn get(&self, key: &str) -> ClientStoreResult<Option<serde_json::Value>> {
        Ok(self.map.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> ClientStoreResult<()> {
        self.map.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> ClientStoreResult<()> {
        self.map.write().remove(key);
        Ok(())
    }
}
