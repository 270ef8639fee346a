use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::wallet::session::{WalletProviderKind, WalletSession};

/// 錢包提供方錯誤
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 用戶在提供方界面拒絕了授權
    #[error("用戶拒絕了錢包授權: {0}")]
    Rejected(String),

    /// 與提供方通信的網路錯誤
    #[error("錢包提供方網路錯誤: {0}")]
    Network(String),

    /// 提供方返回了無法理解的響應或不支持請求的操作
    #[error("錢包提供方協議錯誤: {0}")]
    Protocol(String),
}

/// 提供方結果類型別名
pub type ProviderResult<T> = Result<T, ProviderError>;

/// 錢包提供方特徵
///
/// 封裝單一錢包後端。連接器在會話的整個生命週期持有同一個實例，
/// 不按操作重新構建。直連與重定向兩種授權流程都通過這個接口表達，
/// 最終匯聚為同一種 [`WalletSession`] 表示。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// 提供方類型，決定連接器選擇哪種授權流程
    fn kind(&self) -> WalletProviderKind;

    /// 進程內直連授權（彈窗/擴充套件），不發生導航
    async fn connect_direct(&self) -> ProviderResult<WalletSession>;

    /// 重定向授權頁面的 URL，由呼叫方負責導航
    fn authorization_url(&self) -> ProviderResult<Url>;

    /// 以回調攜帶的帳戶識別碼換取完整會話
    async fn exchange_callback(&self, account_id: &str) -> ProviderResult<WalletSession>;

    /// 驗證會話在提供方側是否仍然有效；`Ok(false)` 表示已被撤銷
    async fn validate_session(&self, session: &WalletSession) -> ProviderResult<bool>;

    /// 通知提供方斷開會話，盡力而為
    async fn disconnect(&self, session: &WalletSession) -> ProviderResult<()>;
}
