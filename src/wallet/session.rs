use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 錢包提供方類型
///
/// 帳戶制提供方以人類可讀帳戶名標識並走重定向授權；
/// 地址制提供方以地址標識並走進程內直連授權。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletProviderKind {
    Account,
    Address,
}

impl WalletProviderKind {
    /// 將提供方類型轉換為字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletProviderKind::Account => "account",
            WalletProviderKind::Address => "address",
        }
    }
}

impl fmt::Display for WalletProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 錢包會話
///
/// 由 WalletConnector 獨佔持有；策略存儲與執行追蹤不直接讀寫會話。
/// `account_id` 在地址制提供方下存放鏈上地址。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub provider: WalletProviderKind,
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    pub connected_at: DateTime<Utc>,
}

/// 連接狀態機的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        write!(f, "{}", name)
    }
}
