use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::chain::ledger::LedgerError;
use crate::chain::persister::{OnChainPersister, PersistError};
use crate::execution::tracker::ExecutionTracker;
use crate::storage::models::{ExecutionStatus, NewExecutionRecord, SavedStrategy};
use crate::utils::elapsed_secs;
use crate::wallet::connector::WalletConnector;
use crate::wallet::pending::CallbackParams;
use crate::wallet::session::WalletProviderKind;
use crate::wallet::store::{keys, read_value, write_value, ClientStore, ClientStoreError};

/// 生命週期錯誤
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// 前置條件不滿足：需要先連接錢包
    #[error("錢包未連接，請先連接錢包再提交策略")]
    WalletRequired,

    /// 同一策略已有提交在進行中
    #[error("策略 {0} 已有提交正在進行中")]
    AlreadyInFlight(String),

    /// 帳本側失敗，按分類透傳
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// 客戶端存儲錯誤
    #[error("客戶端存儲錯誤: {0}")]
    Store(#[from] ClientStoreError),
}

impl From<PersistError> for LifecycleError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::WalletNotConnected => LifecycleError::WalletRequired,
            PersistError::Ledger(err) => LifecycleError::Ledger(err),
        }
    }
}

/// 生命週期結果類型別名
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// 一次成功提交的回執
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReceipt {
    pub strategy_id: String,
    pub transaction_hash: String,
}

/// 重定向式鏈上寫入的待定執行標記
///
/// 提交可能經由錢包導航離開頁面解決；導航前持久化策略識別碼，
/// 下次加載時憑著陸參數裡的交易哈希補記結果。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingExecution {
    strategy_id: String,
    created_at: DateTime<Utc>,
    ttl_secs: u64,
}

impl PendingExecution {
    fn new(strategy_id: &str, ttl: std::time::Duration) -> Self {
        Self {
            strategy_id: strategy_id.to_string(),
            created_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
        }
    }

    fn is_expired(&self, now: &DateTime<Utc>) -> bool {
        elapsed_secs(&self.created_at, now) > self.ttl_secs
    }
}

/// 進行中提交的釋放守衛
struct InFlightGuard<'a> {
    in_flight: &'a DashSet<String>,
    id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}

/// 生命週期協調器
///
/// `execute` 的編排順序：同一策略識別碼的單飛守衛 → 錢包前置條件 →
/// 帳本提交 → 僅在結果明確後寫回執行歷史。守衛在成功與失敗路徑上
/// 都會釋放。
///
/// 失敗的歷史策略（見 DESIGN.md）：不可重試的失敗追加 `failed` 記錄；
/// 可重試的網路/超時失敗不動歷史，讓呼叫方重試時策略不被標記為失敗。
pub struct LifecycleCoordinator {
    tracker: Arc<ExecutionTracker>,
    connector: Arc<WalletConnector>,
    persister: Arc<OnChainPersister>,
    client_store: Arc<dyn ClientStore>,
    in_flight: DashSet<String>,
    pending_execution_ttl: std::time::Duration,
}

impl LifecycleCoordinator {
    /// 創建新的協調器
    pub fn new(
        tracker: Arc<ExecutionTracker>,
        connector: Arc<WalletConnector>,
        persister: Arc<OnChainPersister>,
        client_store: Arc<dyn ClientStore>,
        pending_execution_ttl: std::time::Duration,
    ) -> Self {
        Self {
            tracker,
            connector,
            persister,
            client_store,
            in_flight: DashSet::new(),
            pending_execution_ttl,
        }
    }

    /// 把策略提交到帳本並記錄結果
    pub async fn execute(&self, strategy: &SavedStrategy) -> LifecycleResult<ExecutionReceipt> {
        // 單飛守衛：同一策略識別碼同時最多一次帳本提交
        if !self.in_flight.insert(strategy.id.clone()) {
            return Err(LifecycleError::AlreadyInFlight(strategy.id.clone()));
        }
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            id: strategy.id.clone(),
        };

        // 錢包前置條件：未連接時不產生任何副作用
        if self.connector.connected_session().await.is_none() {
            return Err(LifecycleError::WalletRequired);
        }

        // 重定向式錢包的提交可能經由整頁導航解決；先留下恢復標記
        let redirect_flow = self.connector.provider_kind() == WalletProviderKind::Account;
        if redirect_flow {
            let marker = PendingExecution::new(&strategy.id, self.pending_execution_ttl);
            if let Err(err) =
                write_value(self.client_store.as_ref(), keys::PENDING_EXECUTION, &marker).await
            {
                warn!("寫入待定執行標記失敗: {}", err);
            }
        }

        match self.persister.store_complete_strategy(strategy).await {
            Ok(transaction_hash) => {
                self.clear_pending_execution().await;
                let recorded = self
                    .tracker
                    .add_execution_record(&strategy.id, NewExecutionRecord {
                        status: ExecutionStatus::Completed,
                        transaction_hash: Some(transaction_hash.clone()),
                        ..Default::default()
                    })
                    .await;
                if !recorded {
                    error!("策略 {} 的完成記錄寫入失敗", strategy.id);
                }

                info!("策略 {} 執行完成: {}", strategy.id, transaction_hash);
                Ok(ExecutionReceipt {
                    strategy_id: strategy.id.clone(),
                    transaction_hash,
                })
            }
            Err(PersistError::WalletNotConnected) => {
                self.clear_pending_execution().await;
                Err(LifecycleError::WalletRequired)
            }
            Err(PersistError::Ledger(err)) => {
                match &err {
                    // 超時可能意味著提交正經由錢包導航解決，標記留待回調恢復
                    LedgerError::Timeout(_) if redirect_flow => {
                        debug!("策略 {} 提交超時，保留待定執行標記", strategy.id)
                    }
                    _ => self.clear_pending_execution().await,
                }

                if !err.is_retryable() {
                    let recorded = self
                        .tracker
                        .add_execution_record(&strategy.id, NewExecutionRecord {
                            status: ExecutionStatus::Failed,
                            error_message: Some(err.to_string()),
                            ..Default::default()
                        })
                        .await;
                    if !recorded {
                        error!("策略 {} 的失敗記錄寫入失敗", strategy.id);
                    }
                }

                Err(err.into())
            }
        }
    }

    /// 從著陸參數恢復一次重定向式提交
    ///
    /// 著陸 URL 攜帶交易哈希且存在未過期的待定執行標記時，補記
    /// `completed` 記錄並清除標記；其餘情況返回 `None` 且不變更。
    pub async fn resume_from_callback(
        &self,
        params: &CallbackParams,
    ) -> LifecycleResult<Option<ExecutionReceipt>> {
        let Some(transaction_hash) = params.first_transaction_hash() else {
            return Ok(None);
        };

        let marker: Option<PendingExecution> =
            read_value(self.client_store.as_ref(), keys::PENDING_EXECUTION).await?;
        let Some(marker) = marker else {
            debug!("著陸參數攜帶交易哈希但沒有待定執行標記，忽略");
            return Ok(None);
        };

        if marker.is_expired(&Utc::now()) {
            warn!("待定執行標記已過期，已清除");
            self.clear_pending_execution().await;
            return Ok(None);
        }

        self.clear_pending_execution().await;

        let recorded = self
            .tracker
            .add_execution_record(&marker.strategy_id, NewExecutionRecord {
                status: ExecutionStatus::Completed,
                transaction_hash: Some(transaction_hash.to_string()),
                ..Default::default()
            })
            .await;
        if !recorded {
            warn!("待定執行標記指向不存在的策略: {}", marker.strategy_id);
            return Ok(None);
        }

        info!("策略 {} 經回調恢復完成: {}", marker.strategy_id, transaction_hash);
        Ok(Some(ExecutionReceipt {
            strategy_id: marker.strategy_id,
            transaction_hash: transaction_hash.to_string(),
        }))
    }

    async fn clear_pending_execution(&self) {
        if let Err(err) = self.client_store.remove(keys::PENDING_EXECUTION).await {
            warn!("清除待定執行標記失敗: {}", err);
        }
    }
}
