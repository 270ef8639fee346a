use async_trait::async_trait;
use parking_lot::RwLock;

use crate::storage::models::SavedStrategy;
use crate::storage::repository::{RepositoryResult, StrategyCollectionRepository};

/// 內存策略儲存庫實現
///
/// 用於測試與臨時運行，進程結束後數據即消失。
#[derive(Default)]
pub struct InMemoryRepository {
    strategies: RwLock<Vec<SavedStrategy>>,
}

impl InMemoryRepository {
    /// 創建新的內存儲存庫
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StrategyCollectionRepository for InMemoryRepository {
    async fn load_all(&self) -> RepositoryResult<Vec<SavedStrategy>> {
        Ok(self.strategies.read().clone())
    }

    async fn persist_all(&self, strategies: &[SavedStrategy]) -> RepositoryResult<()> {
        *self.strategies.write() = strategies.to_vec();
        Ok(())
    }
}
