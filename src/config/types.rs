use crate::config::validation::{ValidationError, ValidationUtils, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 應用程序配置結構
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub app: AppConfig,
    pub log: LogConfig,
    pub storage: StorageConfig,
    pub wallet: WalletConfig,
    pub ledger: LedgerConfig,
}

impl Validator for ApplicationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證各個部分的配置
        self.app.validate()?;
        self.log.validate()?;
        self.storage.validate()?;
        self.wallet.validate()?;
        self.ledger.validate()?;

        Ok(())
    }
}

/// 應用程序配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
}

impl Validator for AppConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.name, "app.name")?;

        Ok(())
    }
}

/// 日誌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
    /// 日誌文件輸出目錄，未設定時僅輸出到控制台
    pub directory: Option<String>,
}

impl Validator for LogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證日誌級別
        ValidationUtils::one_of(
            &self.level.to_lowercase(),
            &["trace", "debug", "info", "warn", "error"],
            "log.level",
        )?;

        // 驗證日誌格式
        ValidationUtils::one_of(&self.format.to_lowercase(), &["pretty", "json"], "log.format")?;

        Ok(())
    }
}

/// 持久化配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 策略集合的持久化文件路徑
    pub strategies_file: String,
    /// 客戶端本地存儲（錢包會話、待定標記）的文件路徑
    pub client_store_file: String,
}

impl Validator for StorageConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.strategies_file, "storage.strategies_file")?;
        ValidationUtils::not_empty(&self.client_store_file, "storage.client_store_file")?;

        Ok(())
    }
}

/// 錢包配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// 錢包提供方類型: account（帳戶制，重定向流程）或 address（地址制，直連流程）
    pub provider: String,
    /// 錢包授權頁面的基礎 URL
    pub wallet_url: String,
    /// 用於會話驗證的 RPC 端點
    pub rpc_url: String,
    /// 授權完成後返回的應用 URL
    pub app_url: String,
    /// 直連流程的超時秒數
    pub connect_timeout_secs: u64,
    /// 重定向待定標記的有效期秒數
    pub pending_ttl_secs: u64,
}

impl Validator for WalletConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::one_of(&self.provider.to_lowercase(), &["account", "address"], "wallet.provider")?;
        ValidationUtils::valid_url(&self.wallet_url, "wallet.wallet_url")?;
        ValidationUtils::valid_url(&self.rpc_url, "wallet.rpc_url")?;
        ValidationUtils::valid_url(&self.app_url, "wallet.app_url")?;
        ValidationUtils::in_range(self.connect_timeout_secs, 1, 600, "wallet.connect_timeout_secs")?;
        ValidationUtils::in_range(self.pending_ttl_secs, 30, 86400, "wallet.pending_ttl_secs")?;

        Ok(())
    }
}

impl WalletConfig {
    /// 獲取直連超時持續時間
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// 獲取待定標記有效期
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_secs)
    }
}

/// 帳本配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// 帳本閘道端點
    pub endpoint: String,
    /// 策略存儲合約的帳戶識別碼
    pub contract_id: String,
    /// 提交操作的超時秒數
    pub submit_timeout_secs: u64,
}

impl Validator for LedgerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::valid_url(&self.endpoint, "ledger.endpoint")?;
        ValidationUtils::not_empty(&self.contract_id, "ledger.contract_id")?;
        ValidationUtils::in_range(self.submit_timeout_secs, 1, 600, "ledger.submit_timeout_secs")?;

        Ok(())
    }
}

impl LedgerConfig {
    /// 獲取提交超時持續時間
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }
}
