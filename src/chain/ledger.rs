use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::models::{SavedStrategy, StrategyStep};
use crate::wallet::session::WalletSession;

/// 帳本錯誤
///
/// 提交失敗必須可被呼叫方區分：用戶拒絕不重試、網路與超時可重試、
/// 協議錯誤為致命、未知錯誤保守地按致命處理。
#[derive(Debug, Error)]
pub enum LedgerError {
    /// 用戶在錢包側拒絕了交易
    #[error("用戶拒絕了交易: {0}")]
    Rejected(String),

    /// 網路故障，可重試
    #[error("帳本網路錯誤: {0}")]
    Network(String),

    /// 提交在限定時間內未解決，可重試
    #[error("帳本提交超時（{0} 秒）")]
    Timeout(u64),

    /// 序列化或協議不匹配，致命
    #[error("帳本協議錯誤: {0}")]
    Protocol(String),

    /// 無法歸類的失敗，保守地按致命處理
    #[error("未知的帳本錯誤: {0}")]
    Unknown(String),
}

impl LedgerError {
    /// 呼叫方是否可以重試
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Network(_) | LedgerError::Timeout(_))
    }
}

/// 帳本結果類型別名
pub type LedgerResult<T> = Result<T, LedgerError>;

/// 提交到帳本的步驟表示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadStep {
    pub action: String,
    pub protocol: String,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_apy: Option<f64>,
}

impl From<&StrategyStep> for PayloadStep {
    fn from(step: &StrategyStep) -> Self {
        Self {
            action: step.action.clone(),
            protocol: step.protocol.clone(),
            asset: step.asset.clone(),
            amount: step.amount.clone(),
            expected_apy: step.expected_apy,
        }
    }
}

/// 提交到帳本的策略快照
///
/// 策略記錄中標識性欄位的子集，按存儲合約期望的形式序列化；
/// 保存與執行元數據（名稱、歷史、績效）不出本地。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPayload {
    pub id: String,
    pub goal: String,
    pub chains: Vec<String>,
    pub protocols: Vec<String>,
    pub steps: Vec<PayloadStep>,
    pub risk_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_apy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_tvl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

impl StrategyPayload {
    /// 由已保存的策略構建快照
    pub fn from_saved(strategy: &SavedStrategy) -> Self {
        Self {
            id: strategy.id.clone(),
            goal: strategy.goal.clone(),
            chains: strategy.chains.clone(),
            protocols: strategy.protocols.clone(),
            steps: strategy.steps.iter().map(PayloadStep::from).collect(),
            risk_level: strategy.risk_level.clone(),
            estimated_apy: strategy.estimated_apy,
            estimated_tvl: strategy.estimated_tvl.clone(),
            confidence: strategy.confidence,
            reasoning: strategy.reasoning.clone(),
            warnings: strategy.warnings.clone(),
        }
    }

    /// 提交前的快照檢查；存儲合約拒絕空識別碼
    pub fn validate(&self) -> LedgerResult<()> {
        if self.id.trim().is_empty() {
            return Err(LedgerError::Protocol("策略識別碼不能為空".to_string()));
        }
        Ok(())
    }
}

/// 帳本邊界特徵
///
/// 外部的、可失敗的遠程過程：成功返回交易識別碼，失敗按
/// [`LedgerError`] 分類。實現不得觸碰本地策略存儲。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// 通過已連接的會話提交策略快照
    async fn submit(
        &self,
        payload: &StrategyPayload,
        session: &WalletSession,
    ) -> LedgerResult<String>;
}
