use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};
use url::Url;

use crate::config::WalletConfig;
use crate::wallet::provider::{ProviderError, ProviderResult, WalletProvider};
use crate::wallet::session::{WalletProviderKind, WalletSession};

/// HTTP 錢包提供方實現
///
/// 帳戶制錢包的捆綁實現：授權通過提供方的網頁走重定向流程，
/// 會話驗證與餘額查詢通過 JSON-RPC 端點完成。
pub struct HttpWalletProvider {
    kind: WalletProviderKind,
    wallet_url: Url,
    rpc_url: Url,
    app_url: Url,
    client: reqwest::Client,
}

impl HttpWalletProvider {
    /// 由錢包配置創建提供方
    pub fn new(config: &WalletConfig) -> ProviderResult<Self> {
        let kind = match config.provider.to_lowercase().as_str() {
            "address" => WalletProviderKind::Address,
            _ => WalletProviderKind::Account,
        };

        let wallet_url = Url::parse(&config.wallet_url)
            .map_err(|e| ProviderError::Protocol(format!("無效的錢包 URL: {}", e)))?;
        let rpc_url = Url::parse(&config.rpc_url)
            .map_err(|e| ProviderError::Protocol(format!("無效的 RPC URL: {}", e)))?;
        let app_url = Url::parse(&config.app_url)
            .map_err(|e| ProviderError::Protocol(format!("無效的應用 URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.connect_timeout())
            .build()
            .map_err(|e| ProviderError::Protocol(format!("無法構建 HTTP 客戶端: {}", e)))?;

        Ok(Self {
            kind,
            wallet_url,
            rpc_url,
            app_url,
            client,
        })
    }

    /// 查詢帳戶視圖，返回餘額；帳戶不存在時返回 `None`
    async fn view_account(&self, account_id: &str) -> ProviderResult<Option<String>> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "strategy-vault",
            "method": "query",
            "params": {
                "request_type": "view_account",
                "finality": "final",
                "account_id": account_id,
            }
        });

        let response = self
            .client
            .post(self.rpc_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol(format!("無法解析 RPC 響應: {}", e)))?;

        if value.get("error").is_some() {
            debug!("帳戶 {} 在提供方側不存在或不可用", account_id);
            return Ok(None);
        }

        let balance = value
            .pointer("/result/amount")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Ok(Some(balance.unwrap_or_else(|| "0".to_string())))
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    fn kind(&self) -> WalletProviderKind {
        self.kind
    }

    async fn connect_direct(&self) -> ProviderResult<WalletSession> {
        // 捆綁的 HTTP 提供方只有重定向授權可用；直連流程屬於
        // 進程內的擴充套件提供方
        Err(ProviderError::Protocol(
            "HTTP 提供方僅支持重定向授權流程".to_string(),
        ))
    }

    fn authorization_url(&self) -> ProviderResult<Url> {
        let mut url = self
            .wallet_url
            .join("login")
            .map_err(|e| ProviderError::Protocol(format!("無法構建授權 URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("success_url", self.app_url.as_str())
            .append_pair("failure_url", self.app_url.as_str());

        Ok(url)
    }

    async fn exchange_callback(&self, account_id: &str) -> ProviderResult<WalletSession> {
        // 餘額查詢是盡力而為的元數據：網路故障不阻斷連接
        let balance = match self.view_account(account_id).await {
            Ok(Some(balance)) => Some(balance),
            Ok(None) => {
                return Err(ProviderError::Protocol(format!(
                    "回調帳戶在提供方側不存在: {}",
                    account_id
                )))
            }
            Err(err) => {
                warn!("查詢帳戶餘額失敗，繼續連接: {}", err);
                None
            }
        };

        Ok(WalletSession {
            provider: self.kind,
            account_id: account_id.to_string(),
            balance,
            connected_at: Utc::now(),
        })
    }

    async fn validate_session(&self, session: &WalletSession) -> ProviderResult<bool> {
        Ok(self.view_account(&session.account_id).await?.is_some())
    }

    async fn disconnect(&self, session: &WalletSession) -> ProviderResult<()> {
        // 帳戶制錢包沒有需要撤銷的服務端狀態
        debug!("會話 {} 已在本地斷開", session.account_id);
        Ok(())
    }
}
