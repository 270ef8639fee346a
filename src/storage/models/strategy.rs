use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 策略聚合狀態
///
/// 始終與最近一筆執行記錄保持一致，由 ExecutionTracker 負責推導。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyStatus {
    Saved,
    Executing,
    Completed,
    Failed,
}

impl StrategyStatus {
    /// 將狀態轉換為字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyStatus::Saved => "saved",
            StrategyStatus::Executing => "executing",
            StrategyStatus::Completed => "completed",
            StrategyStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "saved" => Ok(StrategyStatus::Saved),
            "executing" => Ok(StrategyStatus::Executing),
            "completed" => Ok(StrategyStatus::Completed),
            "failed" => Ok(StrategyStatus::Failed),
            other => Err(format!("無效的策略狀態: {}", other)),
        }
    }
}

/// 單次執行嘗試的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Started,
    InProgress,
    Completed,
    Failed,
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        ExecutionStatus::Started
    }
}

/// 策略步驟
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStep {
    pub action: String,
    pub protocol: String,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_apy: Option<f64>,
}

/// 生成的收益策略計劃
///
/// 計劃由外部的生成步驟產出，生成後不可變；`id` 在保存時若缺失則由存儲層補齊。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub goal: String,
    pub chains: Vec<String>,
    pub protocols: Vec<String>,
    pub steps: Vec<StrategyStep>,
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

/// 執行記錄模型
///
/// 描述對策略的一次執行嘗試，追加後不可修改或刪除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_return: Option<f64>,
}

/// 執行記錄插入模型
///
/// `id` 與 `timestamp` 由 ExecutionTracker 在追加時合成。
#[derive(Debug, Clone, Default)]
pub struct NewExecutionRecord {
    pub status: ExecutionStatus,
    pub transaction_hash: Option<String>,
    pub error_message: Option<String>,
    pub gas_used: Option<String>,
    pub actual_return: Option<f64>,
}

/// 策略績效指標
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_apy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_return: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_value: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// 績效指標更新模型，僅合併提供的欄位
#[derive(Debug, Clone, Default)]
pub struct PerformanceUpdate {
    pub current_apy: Option<f64>,
    pub total_return: Option<f64>,
    pub total_value: Option<String>,
}

/// 已保存的策略模型
///
/// 即持久化集合中的一筆記錄：計劃欄位加上保存與執行元數據。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedStrategy {
    pub id: String,
    pub goal: String,
    pub chains: Vec<String>,
    pub protocols: Vec<String>,
    pub steps: Vec<StrategyStep>,
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
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub status: StrategyStatus,
    #[serde(default)]
    pub execution_history: Vec<ExecutionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl SavedStrategy {
    /// 由計劃與保存元數據構建新記錄
    pub fn from_plan(plan: StrategyPlan, id: String, name: &str, tags: Option<Vec<String>>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            goal: plan.goal,
            chains: plan.chains,
            protocols: plan.protocols,
            steps: plan.steps,
            risk_level: plan.risk_level,
            estimated_apy: plan.estimated_apy,
            estimated_tvl: plan.estimated_tvl,
            confidence: plan.confidence,
            reasoning: plan.reasoning,
            warnings: plan.warnings,
            name: name.to_string(),
            created_at,
            updated_at: None,
            status: StrategyStatus::Saved,
            execution_history: Vec::new(),
            performance: None,
            tags,
        }
    }

    /// 最近一筆執行記錄
    pub fn latest_execution(&self) -> Option<&ExecutionRecord> {
        self.execution_history.last()
    }

    /// 查詢字串是否命中名稱、目標或任一標籤（不區分大小寫）
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        if self.name.to_lowercase().contains(&q) || self.goal.to_lowercase().contains(&q) {
            return true;
        }
        self.tags
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .any(|tag| tag.to_lowercase().contains(&q))
    }
}

/// 策略更新模型，僅合併提供的欄位
#[derive(Debug, Clone, Default)]
pub struct StrategyPatch {
    pub name: Option<String>,
    pub status: Option<StrategyStatus>,
    pub execution_history: Option<Vec<ExecutionRecord>>,
    pub performance: Option<PerformanceMetrics>,
    pub tags: Option<Vec<String>>,
}
