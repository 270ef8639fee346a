//! 重定向授權的待定標記與回調解析
//!
//! 重定向流程沒有進程內回調：導航離開前先持久化一個帶有效期的
//! 待定標記，下次加載時從著陸 URL 解析返回參數，並由純函數
//! [`resolve_callback`] 判定三種結果之一：換得會話、標記過期、
//! 或根本不是一次待定回調。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::utils::elapsed_secs;
use crate::wallet::session::{WalletProviderKind, WalletSession};

/// 待定連接標記
///
/// 導航離開前寫入客戶端本地存儲；超過有效期後視為已放棄。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConnection {
    pub provider: WalletProviderKind,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl PendingConnection {
    /// 創建新的待定標記
    pub fn new(provider: WalletProviderKind, ttl: Duration) -> Self {
        Self {
            provider,
            created_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
        }
    }

    /// 標記是否已超過有效期
    pub fn is_expired(&self, now: &DateTime<Utc>) -> bool {
        elapsed_secs(&self.created_at, now) > self.ttl_secs
    }
}

/// 從著陸 URL 解析出的回調參數
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackParams {
    /// 授權成功後提供方附加的帳戶識別碼
    pub account_id: Option<String>,
    /// 鏈上寫入完成後提供方附加的交易哈希（可能以逗號分隔多筆）
    pub transaction_hashes: Option<String>,
}

impl CallbackParams {
    /// 解析著陸 URL 的查詢參數
    pub fn from_url(raw: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(raw)?;
        let mut params = Self::default();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "account_id" => params.account_id = Some(value.into_owned()),
                "transactionHashes" => params.transaction_hashes = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(params)
    }

    /// 是否不含任何已識別的回調參數
    pub fn is_empty(&self) -> bool {
        self.account_id.is_none() && self.transaction_hashes.is_none()
    }

    /// 交易哈希參數的第一筆
    pub fn first_transaction_hash(&self) -> Option<&str> {
        self.transaction_hashes
            .as_deref()
            .and_then(|hashes| hashes.split(',').next())
            .filter(|hash| !hash.is_empty())
    }
}

/// 回調解析結果
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackResolution {
    /// 回調有效，得到會話骨架（餘額等由提供方補齊）
    Session(WalletSession),
    /// 待定標記已過期
    Expired,
    /// 不存在待定標記或著陸參數不含帳戶識別碼
    NotAPendingCallback,
}

/// 判定一次著陸是否為待定連接的回調
pub fn resolve_callback(
    pending: Option<&PendingConnection>,
    params: &CallbackParams,
    now: DateTime<Utc>,
) -> CallbackResolution {
    let Some(pending) = pending else {
        return CallbackResolution::NotAPendingCallback;
    };
    let Some(account_id) = params.account_id.clone() else {
        return CallbackResolution::NotAPendingCallback;
    };

    if pending.is_expired(&now) {
        return CallbackResolution::Expired;
    }

    CallbackResolution::Session(WalletSession {
        provider: pending.provider,
        account_id,
        balance: None,
        connected_at: now,
    })
}
