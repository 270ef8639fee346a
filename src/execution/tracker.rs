use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::storage::models::{
    ExecutionRecord, ExecutionStatus, NewExecutionRecord, PerformanceMetrics, PerformanceUpdate,
    StrategyPatch, StrategyStatus,
};
use crate::storage::store::StrategyStore;
use crate::utils::generate_prefixed_id;

/// 執行追蹤器
///
/// 對策略追加不可變的執行記錄，並由最近一筆記錄推導策略的聚合狀態。
/// 執行歷史是追加型的：這裡不提供任何移除或重排既有記錄的操作。
pub struct ExecutionTracker {
    store: Arc<StrategyStore>,
}

impl ExecutionTracker {
    /// 創建新的執行追蹤器
    pub fn new(store: Arc<StrategyStore>) -> Self {
        Self { store }
    }

    /// 追加一筆執行記錄並重新推導策略狀態
    ///
    /// 記錄識別碼與時間戳在此合成。策略不存在時返回 `false`，不做任何變更。
    ///
    /// 狀態推導採固定映射：`started → executing`、`completed → completed`、
    /// `failed → failed`、`in_progress → 維持原狀`。
    pub async fn add_execution_record(&self, strategy_id: &str, record: NewExecutionRecord) -> bool {
        let Some(strategy) = self.store.get_by_id(strategy_id).await else {
            warn!("追加執行記錄失敗，策略不存在: {}", strategy_id);
            return false;
        };

        let entry = ExecutionRecord {
            id: generate_prefixed_id("exec"),
            timestamp: Utc::now(),
            status: record.status,
            transaction_hash: record.transaction_hash,
            error_message: record.error_message,
            gas_used: record.gas_used,
            actual_return: record.actual_return,
        };

        let status = Self::derive_status(record.status, strategy.status);

        let mut history = strategy.execution_history;
        history.push(entry);

        let patch = StrategyPatch {
            status: Some(status),
            execution_history: Some(history),
            ..Default::default()
        };

        let updated = self.store.update(strategy_id, patch).await.is_some();
        if updated {
            debug!("策略 {} 狀態推導為 {}", strategy_id, status);
        }
        updated
    }

    /// 合併績效指標並更新 `last_updated`
    ///
    /// 僅覆寫提供的欄位；不改變策略的聚合狀態。策略不存在時返回 `false`。
    pub async fn update_performance_metrics(
        &self,
        strategy_id: &str,
        update: PerformanceUpdate,
    ) -> bool {
        let Some(strategy) = self.store.get_by_id(strategy_id).await else {
            warn!("更新績效指標失敗，策略不存在: {}", strategy_id);
            return false;
        };

        let mut metrics = strategy.performance.unwrap_or(PerformanceMetrics {
            current_apy: None,
            total_return: None,
            total_value: None,
            last_updated: Utc::now(),
        });

        if let Some(apy) = update.current_apy {
            metrics.current_apy = Some(apy);
        }
        if let Some(total_return) = update.total_return {
            metrics.total_return = Some(total_return);
        }
        if let Some(total_value) = update.total_value {
            metrics.total_value = Some(total_value);
        }
        metrics.last_updated = Utc::now();

        let patch = StrategyPatch {
            performance: Some(metrics),
            ..Default::default()
        };

        self.store.update(strategy_id, patch).await.is_some()
    }

    /// 由最新執行狀態推導策略聚合狀態，最近的終態或活躍信號勝出
    fn derive_status(latest: ExecutionStatus, current: StrategyStatus) -> StrategyStatus {
        match latest {
            ExecutionStatus::Started => StrategyStatus::Executing,
            ExecutionStatus::Completed => StrategyStatus::Completed,
            ExecutionStatus::Failed => StrategyStatus::Failed,
            ExecutionStatus::InProgress => current,
        }
    }
}
