use async_trait::async_trait;
use thiserror::Error;

use crate::storage::models::SavedStrategy;

// 重新導出子模塊
pub mod json_file;
pub mod memory;

// 重新導出具體實現
pub use json_file::JsonFileRepository;
pub use memory::InMemoryRepository;

/// 持久化層錯誤
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// IO 錯誤
    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化錯誤
    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 持久化層結果類型別名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// 策略集合儲存庫特徵
///
/// 集合在邏輯上是單一 JSON 文檔，讀寫均以整個集合為單位；
/// 寫入的序列化由上層 StrategyStore 負責。
#[async_trait]
pub trait StrategyCollectionRepository: Send + Sync {
    /// 載入整個策略集合，存儲尚不存在時返回空集合
    async fn load_all(&self) -> RepositoryResult<Vec<SavedStrategy>>;

    /// 以整個集合覆寫持久化存儲
    async fn persist_all(&self, strategies: &[SavedStrategy]) -> RepositoryResult<()>;
}
