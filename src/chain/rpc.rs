use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::chain::ledger::{Ledger, LedgerError, LedgerResult, StrategyPayload};
use crate::config::LedgerConfig;
use crate::wallet::session::WalletSession;

/// HTTP 帳本閘道實現
///
/// 把策略快照提交給配置的閘道端點，由閘道代為完成合約調用。
/// 傳輸層與 HTTP 狀態碼的失敗映射到 [`LedgerError`] 的分類。
pub struct HttpLedger {
    endpoint: Url,
    contract_id: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpLedger {
    /// 由帳本配置創建閘道客戶端
    pub fn new(config: &LedgerConfig) -> LedgerResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| LedgerError::Protocol(format!("無效的帳本端點: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.submit_timeout())
            .build()
            .map_err(|e| LedgerError::Unknown(format!("無法構建 HTTP 客戶端: {}", e)))?;

        Ok(Self {
            endpoint,
            contract_id: config.contract_id.clone(),
            client,
            timeout_secs: config.submit_timeout_secs,
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> LedgerError {
        if err.is_timeout() {
            LedgerError::Timeout(self.timeout_secs)
        } else {
            LedgerError::Network(err.to_string())
        }
    }

    fn classify_status(status: StatusCode, body: &str) -> LedgerError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LedgerError::Rejected(body.to_string())
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                LedgerError::Protocol(body.to_string())
            }
            status if status.is_server_error() => LedgerError::Network(format!(
                "閘道返回 {}: {}",
                status, body
            )),
            status => LedgerError::Unknown(format!("閘道返回 {}: {}", status, body)),
        }
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn submit(
        &self,
        payload: &StrategyPayload,
        session: &WalletSession,
    ) -> LedgerResult<String> {
        let url = self
            .endpoint
            .join("strategies")
            .map_err(|e| LedgerError::Protocol(format!("無法構建提交 URL: {}", e)))?;

        let body = serde_json::json!({
            "contract_id": self.contract_id,
            "sender": session.account_id,
            "strategy": payload,
        });

        debug!("提交策略 {} 至 {}", payload.id, url);

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &text));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LedgerError::Protocol(format!("無法解析帳本響應: {}", e)))?;

        value
            .get("transaction_hash")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| LedgerError::Protocol("帳本響應缺少 transaction_hash".to_string()))
    }
}
