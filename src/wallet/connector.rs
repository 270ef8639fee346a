//! 錢包連接狀態機
//!
//! 每個提供方一台狀態機：
//!
//! ```plain
//!            connect / resume_from_callback
//! Disconnected ──────► Connecting ──────► Connected
//!      ▲                   │                  │
//!      │     超時 / 拒絕 / 標記過期            │ disconnect / 提供方撤銷
//!      └───────────────────┴──────────────────┘
//! ```
//!
//! 直連與重定向兩種授權流程都匯聚為同一種 `Connected` 表示；
//! 重定向流程跨越整頁導航，依靠持久化的待定標記在下次加載時恢復。

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::wallet::pending::{
    resolve_callback, CallbackParams, CallbackResolution, PendingConnection,
};
use crate::wallet::provider::{ProviderError, WalletProvider};
use crate::wallet::session::{ConnectionState, WalletProviderKind, WalletSession};
use crate::wallet::store::{keys, read_value, write_value, ClientStore, ClientStoreError};

/// 連接器錯誤
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// 提供方錯誤
    #[error("錢包提供方錯誤: {0}")]
    Provider(#[from] ProviderError),

    /// 客戶端存儲錯誤
    #[error("客戶端存儲錯誤: {0}")]
    Store(#[from] ClientStoreError),

    /// 直連授權超時
    #[error("錢包連接超時（{0} 秒）")]
    Timeout(u64),
}

/// 連接器結果類型別名
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// 一次 `connect` 調用的結果
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    /// 已連接（直連完成，或先前已有會話）
    Connected(WalletSession),
    /// 已發起重定向授權，呼叫方負責導航至該 URL
    RedirectInitiated { authorization_url: Url },
    /// 已有一次連接在進行中，本次調用不再發起第二次授權
    AlreadyConnecting,
}

struct Inner {
    state: ConnectionState,
    session: Option<WalletSession>,
}

/// 錢包連接器
///
/// 會話的獨佔擁有者。為會話的整個生命週期注入並持有同一個
/// 提供方實例；其他組件只通過連接器觀察連接狀態。
pub struct WalletConnector {
    provider: Arc<dyn WalletProvider>,
    store: Arc<dyn ClientStore>,
    inner: Mutex<Inner>,
    connect_timeout: std::time::Duration,
    pending_ttl: std::time::Duration,
}

impl WalletConnector {
    /// 創建新的連接器
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        store: Arc<dyn ClientStore>,
        connect_timeout: std::time::Duration,
        pending_ttl: std::time::Duration,
    ) -> Self {
        Self {
            provider,
            store,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                session: None,
            }),
            connect_timeout,
            pending_ttl,
        }
    }

    /// 當前連接狀態
    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// 當前會話；僅在 `Connected` 狀態下返回 `Some`
    pub async fn connected_session(&self) -> Option<WalletSession> {
        let inner = self.inner.lock().await;
        if inner.state == ConnectionState::Connected {
            inner.session.clone()
        } else {
            None
        }
    }

    /// 提供方類型
    pub fn provider_kind(&self) -> WalletProviderKind {
        self.provider.kind()
    }

    /// 發起連接
    ///
    /// 已連接時直接返回現有會話；連接進行中時不發起第二次
    /// 彈窗或重定向。地址制提供方走直連流程並受超時約束，
    /// 帳戶制提供方持久化待定標記後交由呼叫方導航。
    pub async fn connect(&self) -> ConnectorResult<ConnectOutcome> {
        let mut inner = self.inner.lock().await;

        match inner.state {
            ConnectionState::Connected => {
                if let Some(session) = inner.session.clone() {
                    return Ok(ConnectOutcome::Connected(session));
                }
                // 會話缺失的 Connected 不成立，按斷開處理
                inner.state = ConnectionState::Disconnected;
            }
            ConnectionState::Connecting => return Ok(ConnectOutcome::AlreadyConnecting),
            ConnectionState::Disconnected => {}
        }

        match self.provider.kind() {
            WalletProviderKind::Account => {
                let authorization_url = self.provider.authorization_url()?;
                let pending = PendingConnection::new(self.provider.kind(), self.pending_ttl);
                write_value(self.store.as_ref(), keys::PENDING_CONNECTION, &pending).await?;

                inner.state = ConnectionState::Connecting;
                info!("已發起重定向授權: {}", authorization_url);
                Ok(ConnectOutcome::RedirectInitiated { authorization_url })
            }
            WalletProviderKind::Address => {
                inner.state = ConnectionState::Connecting;
                // 等待提供方期間不持有狀態鎖，讓並發調用能觀察到 Connecting
                drop(inner);

                let result =
                    tokio::time::timeout(self.connect_timeout, self.provider.connect_direct())
                        .await;

                let mut inner = self.inner.lock().await;
                match result {
                    Err(_) => {
                        inner.state = ConnectionState::Disconnected;
                        Err(ConnectorError::Timeout(self.connect_timeout.as_secs()))
                    }
                    Ok(Err(err)) => {
                        inner.state = ConnectionState::Disconnected;
                        Err(err.into())
                    }
                    Ok(Ok(session)) => {
                        if let Err(err) =
                            write_value(self.store.as_ref(), keys::WALLET_SESSION, &session).await
                        {
                            warn!("持久化錢包會話失敗: {}", err);
                        }
                        inner.state = ConnectionState::Connected;
                        inner.session = Some(session.clone());
                        info!("錢包已連接: {}", session.account_id);
                        Ok(ConnectOutcome::Connected(session))
                    }
                }
            }
        }
    }

    /// 從著陸參數恢復重定向授權
    ///
    /// 依次處理三種結果：有效回調換取完整會話並清除標記；
    /// 過期標記清除後維持斷開；非回調著陸不做任何變更。
    pub async fn resume_from_callback(
        &self,
        params: &CallbackParams,
    ) -> ConnectorResult<CallbackResolution> {
        let pending: Option<PendingConnection> =
            read_value(self.store.as_ref(), keys::PENDING_CONNECTION).await?;

        match resolve_callback(pending.as_ref(), params, Utc::now()) {
            CallbackResolution::NotAPendingCallback => {
                Ok(CallbackResolution::NotAPendingCallback)
            }
            CallbackResolution::Expired => {
                self.store.remove(keys::PENDING_CONNECTION).await?;
                let mut inner = self.inner.lock().await;
                inner.state = ConnectionState::Disconnected;
                warn!("待定連接標記已過期，已清除");
                Ok(CallbackResolution::Expired)
            }
            CallbackResolution::Session(skeleton) => {
                let session = match self.provider.exchange_callback(&skeleton.account_id).await {
                    Ok(session) => session,
                    Err(err @ ProviderError::Network(_)) => {
                        // 網路故障時保留標記，允許下次加載重試
                        return Err(err.into());
                    }
                    Err(err) => {
                        self.store.remove(keys::PENDING_CONNECTION).await?;
                        let mut inner = self.inner.lock().await;
                        inner.state = ConnectionState::Disconnected;
                        return Err(err.into());
                    }
                };

                self.store.remove(keys::PENDING_CONNECTION).await?;
                write_value(self.store.as_ref(), keys::WALLET_SESSION, &session).await?;

                let mut inner = self.inner.lock().await;
                inner.state = ConnectionState::Connected;
                inner.session = Some(session.clone());
                info!("錢包已連接: {}", session.account_id);
                Ok(CallbackResolution::Session(session))
            }
        }
    }

    /// 頁面加載時恢復先前的會話
    ///
    /// 存在持久化會話時先經提供方重新驗證再報告 `Connected`；
    /// 驗證失敗靜默重置為 `Disconnected`，不向呼叫方冒泡錯誤。
    pub async fn restore_on_load(&self) -> ConnectionState {
        let session: Option<WalletSession> =
            match read_value(self.store.as_ref(), keys::WALLET_SESSION).await {
                Ok(session) => session,
                Err(err) => {
                    warn!("讀取持久化會話失敗: {}", err);
                    None
                }
            };

        let Some(session) = session else {
            return ConnectionState::Disconnected;
        };

        match self.provider.validate_session(&session).await {
            Ok(true) => {
                let mut inner = self.inner.lock().await;
                inner.state = ConnectionState::Connected;
                inner.session = Some(session.clone());
                debug!("會話 {} 重新驗證通過", session.account_id);
                ConnectionState::Connected
            }
            Ok(false) | Err(_) => {
                if let Err(err) = self.store.remove(keys::WALLET_SESSION).await {
                    warn!("清除失效會話失敗: {}", err);
                }
                let mut inner = self.inner.lock().await;
                inner.state = ConnectionState::Disconnected;
                inner.session = None;
                debug!("持久化會話重新驗證未通過，已重置");
                ConnectionState::Disconnected
            }
        }
    }

    /// 錢包是否已連接
    ///
    /// 區分「沒有會話」與「會話存在但提供方確認已撤銷」：
    /// 後者強制回到 `Disconnected`，不報告過期數據。驗證的
    /// 暫時性失敗不改變狀態。
    pub async fn is_wallet_connected(&self) -> bool {
        let session = {
            let inner = self.inner.lock().await;
            if inner.state != ConnectionState::Connected {
                return false;
            }
            inner.session.clone()
        };

        let Some(session) = session else {
            return false;
        };

        match self.provider.validate_session(&session).await {
            Ok(true) => true,
            Ok(false) => {
                warn!("提供方確認會話 {} 已撤銷", session.account_id);
                if let Err(err) = self.store.remove(keys::WALLET_SESSION).await {
                    warn!("清除已撤銷會話失敗: {}", err);
                }
                let mut inner = self.inner.lock().await;
                inner.state = ConnectionState::Disconnected;
                inner.session = None;
                false
            }
            Err(err) => {
                warn!("會話驗證暫時失敗，維持當前狀態: {}", err);
                true
            }
        }
    }

    /// 斷開連接，冪等
    ///
    /// 已斷開時調用是無操作的成功；清理過程中的存儲故障只記錄
    /// 日誌，不影響斷開結果。
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;

        if let Some(session) = inner.session.take() {
            if let Err(err) = self.provider.disconnect(&session).await {
                warn!("通知提供方斷開失敗: {}", err);
            }
            info!("錢包 {} 已斷開", session.account_id);
        }
        inner.state = ConnectionState::Disconnected;
        drop(inner);

        for key in [keys::WALLET_SESSION, keys::PENDING_CONNECTION] {
            if let Err(err) = self.store.remove(key).await {
                warn!("清除客戶端存儲鍵 {} 失敗: {}", key, err);
            }
        }
    }
}
