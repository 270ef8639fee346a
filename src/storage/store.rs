use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::storage::models::{SavedStrategy, StrategyPatch, StrategyPlan, StrategyStatus};
use crate::storage::repository::StrategyCollectionRepository;
use crate::utils::generate_prefixed_id;

/// 策略存儲
///
/// 持久化集合的唯一擁有者：其他組件一律通過這裡讀寫，不持有可能
/// 與存儲脫節的私有副本。所有寫入在單一鎖後排隊，整個集合以
/// 讀-改-寫的方式落盤，避免交錯寫入造成更新丟失。
///
/// 持久化失敗不會向上拋出：讀取退化為空結果，寫入返回 `false`/`None`，
/// 並以可恢復錯誤記入日誌。
pub struct StrategyStore {
    repository: Arc<dyn StrategyCollectionRepository>,
    write_lock: Mutex<()>,
}

impl StrategyStore {
    /// 創建新的策略存儲
    pub fn new(repository: Arc<dyn StrategyCollectionRepository>) -> Self {
        Self {
            repository,
            write_lock: Mutex::new(()),
        }
    }

    /// 生成不透明的唯一策略識別碼
    pub fn generate_id() -> String {
        generate_prefixed_id("strategy")
    }

    /// 保存計劃為新的策略記錄
    ///
    /// 記錄以 `saved` 狀態創建；計劃缺少識別碼時由存儲層補齊。
    /// 持久化失敗時返回 `None`，集合保持不變。
    pub async fn save(
        &self,
        plan: StrategyPlan,
        name: &str,
        tags: Option<Vec<String>>,
    ) -> Option<SavedStrategy> {
        let _guard = self.write_lock.lock().await;

        let mut strategies = match self.repository.load_all().await {
            Ok(strategies) => strategies,
            Err(err) => {
                error!("讀取策略集合失敗，放棄保存: {}", err);
                return None;
            }
        };

        // 計劃自帶識別碼時沿用；缺失或與現有記錄衝突時重新生成
        let id = match plan.id.clone() {
            Some(id) if !id.is_empty() && !strategies.iter().any(|s| s.id == id) => id,
            Some(id) => {
                debug!("計劃識別碼 {} 不可用，重新生成", id);
                Self::generate_id()
            }
            None => Self::generate_id(),
        };

        let saved = SavedStrategy::from_plan(plan, id, name, tags, Utc::now());
        strategies.push(saved.clone());

        if let Err(err) = self.repository.persist_all(&strategies).await {
            error!("持久化策略集合失敗: {}", err);
            return None;
        }

        debug!("策略 {} 已保存", saved.id);
        Some(saved)
    }

    /// 合併欄位到既有記錄
    ///
    /// `updated_at` 在每次變更時更新且單調不減；識別碼不存在時
    /// 返回 `None` 而不報錯。
    pub async fn update(&self, id: &str, patch: StrategyPatch) -> Option<SavedStrategy> {
        let _guard = self.write_lock.lock().await;

        let mut strategies = match self.repository.load_all().await {
            Ok(strategies) => strategies,
            Err(err) => {
                error!("讀取策略集合失敗，放棄更新: {}", err);
                return None;
            }
        };

        let strategy = strategies.iter_mut().find(|s| s.id == id)?;

        if let Some(name) = patch.name {
            strategy.name = name;
        }
        if let Some(status) = patch.status {
            strategy.status = status;
        }
        if let Some(history) = patch.execution_history {
            strategy.execution_history = history;
        }
        if let Some(performance) = patch.performance {
            strategy.performance = Some(performance);
        }
        if let Some(tags) = patch.tags {
            strategy.tags = Some(tags);
        }

        // 時鐘回撥時夾制到先前的值，保證 updated_at 單調不減
        let now = Utc::now();
        let floor = strategy.updated_at.unwrap_or(strategy.created_at);
        strategy.updated_at = Some(now.max(floor));

        let updated = strategy.clone();

        if let Err(err) = self.repository.persist_all(&strategies).await {
            error!("持久化策略集合失敗: {}", err);
            return None;
        }

        Some(updated)
    }

    /// 刪除記錄，返回是否確有記錄被移除
    pub async fn delete(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock().await;

        let mut strategies = match self.repository.load_all().await {
            Ok(strategies) => strategies,
            Err(err) => {
                error!("讀取策略集合失敗，放棄刪除: {}", err);
                return false;
            }
        };

        let before = strategies.len();
        strategies.retain(|s| s.id != id);
        if strategies.len() == before {
            return false;
        }

        if let Err(err) = self.repository.persist_all(&strategies).await {
            error!("持久化策略集合失敗: {}", err);
            return false;
        }

        true
    }

    /// 根據識別碼獲取記錄
    pub async fn get_by_id(&self, id: &str) -> Option<SavedStrategy> {
        self.snapshot().await.into_iter().find(|s| s.id == id)
    }

    /// 獲取全部記錄
    pub async fn list_all(&self) -> Vec<SavedStrategy> {
        self.snapshot().await
    }

    /// 按聚合狀態過濾記錄
    pub async fn list_by_status(&self, status: StrategyStatus) -> Vec<SavedStrategy> {
        self.snapshot()
            .await
            .into_iter()
            .filter(|s| s.status == status)
            .collect()
    }

    /// 對名稱、目標與標籤做不區分大小寫的查詢
    pub async fn search(&self, query: &str) -> Vec<SavedStrategy> {
        self.snapshot()
            .await
            .into_iter()
            .filter(|s| s.matches_query(query))
            .collect()
    }

    /// 集合中的記錄總數
    pub async fn total(&self) -> usize {
        self.snapshot().await.len()
    }

    async fn snapshot(&self) -> Vec<SavedStrategy> {
        match self.repository.load_all().await {
            Ok(strategies) => strategies,
            Err(err) => {
                error!("讀取策略集合失敗: {}", err);
                Vec::new()
            }
        }
    }
}
