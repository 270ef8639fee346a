use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::chain::ledger::{Ledger, LedgerError, StrategyPayload};
use crate::storage::models::SavedStrategy;
use crate::wallet::connector::WalletConnector;

/// 持久化器錯誤
#[derive(Debug, Error)]
pub enum PersistError {
    /// 前置條件不滿足：錢包未處於已連接狀態
    #[error("錢包未連接，無法寫入帳本")]
    WalletNotConnected,

    /// 帳本側失敗，按 [`LedgerError`] 分類
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// 持久化器結果類型別名
pub type PersistResult<T> = Result<T, PersistError>;

/// 鏈上持久化器
///
/// 把策略快照提交到外部帳本。前置條件是連接器報告 `Connected`：
/// 不滿足時立即失敗，完全不接觸帳本。任何失敗都不在本地存儲留下
/// 可觀察的副作用，成功與否的記錄由協調器負責。
pub struct OnChainPersister {
    connector: Arc<WalletConnector>,
    ledger: Arc<dyn Ledger>,
    submit_timeout: std::time::Duration,
}

impl OnChainPersister {
    /// 創建新的持久化器
    pub fn new(
        connector: Arc<WalletConnector>,
        ledger: Arc<dyn Ledger>,
        submit_timeout: std::time::Duration,
    ) -> Self {
        Self {
            connector,
            ledger,
            submit_timeout,
        }
    }

    /// 提交完整的策略快照，成功時返回交易識別碼
    pub async fn store_complete_strategy(&self, strategy: &SavedStrategy) -> PersistResult<String> {
        // 前置條件：必須已有連接完成的會話
        let Some(session) = self.connector.connected_session().await else {
            return Err(PersistError::WalletNotConnected);
        };

        let payload = StrategyPayload::from_saved(strategy);
        payload.validate()?;

        let secs = self.submit_timeout.as_secs();
        match tokio::time::timeout(self.submit_timeout, self.ledger.submit(&payload, &session))
            .await
        {
            Err(_) => {
                warn!("策略 {} 的帳本提交超時（{} 秒）", strategy.id, secs);
                Err(LedgerError::Timeout(secs).into())
            }
            Ok(Err(err)) => Err(err.into()),
            Ok(Ok(transaction_hash)) => {
                info!("策略 {} 已寫入帳本: {}", strategy.id, transaction_hash);
                Ok(transaction_hash)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ledger::MockLedger;
    use crate::storage::models::StrategyPlan;
    use crate::wallet::provider::MockWalletProvider;
    use crate::wallet::session::{WalletProviderKind, WalletSession};
    use crate::wallet::store::InMemoryClientStore;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use std::time::Duration;

    fn saved(id: &str) -> SavedStrategy {
        let plan = StrategyPlan {
            id: None,
            goal: "goal".to_string(),
            chains: vec![],
            protocols: vec![],
            steps: vec![],
            risk_level: "low".to_string(),
            estimated_apy: None,
            estimated_tvl: None,
            confidence: None,
            reasoning: None,
            warnings: None,
        };
        SavedStrategy::from_plan(plan, id.to_string(), "s", None, Utc::now())
    }

    fn disconnected_connector() -> Arc<WalletConnector> {
        let mut provider = MockWalletProvider::new();
        provider.expect_kind().return_const(WalletProviderKind::Account);
        Arc::new(WalletConnector::new(
            Arc::new(provider),
            Arc::new(InMemoryClientStore::new()),
            Duration::from_secs(5),
            Duration::from_secs(600),
        ))
    }

    async fn connected_connector() -> Arc<WalletConnector> {
        let mut provider = MockWalletProvider::new();
        provider.expect_kind().return_const(WalletProviderKind::Account);
        provider.expect_validate_session().returning(|_| Ok(true));

        let store = Arc::new(InMemoryClientStore::new());
        let session = WalletSession {
            provider: WalletProviderKind::Account,
            account_id: "alice.test".to_string(),
            balance: None,
            connected_at: Utc::now(),
        };
        crate::wallet::store::write_value(store.as_ref(), crate::wallet::store::keys::WALLET_SESSION, &session)
            .await
            .expect("寫入失敗");

        let connector = Arc::new(WalletConnector::new(
            Arc::new(provider),
            store,
            Duration::from_secs(5),
            Duration::from_secs(600),
        ));
        connector.restore_on_load().await;
        connector
    }

    #[tokio::test]
    async fn test_disconnected_wallet_fails_fast_without_ledger_contact() {
        let mut ledger = MockLedger::new();
        ledger.expect_submit().times(0);

        let persister = OnChainPersister::new(
            disconnected_connector(),
            Arc::new(ledger),
            Duration::from_secs(5),
        );

        let result = persister.store_complete_strategy(&saved("strategy_1_a")).await;
        assert_matches!(result, Err(PersistError::WalletNotConnected));
    }

    #[tokio::test]
    async fn test_successful_submit_returns_transaction_hash() {
        let mut ledger = MockLedger::new();
        ledger
            .expect_submit()
            .times(1)
            .returning(|_, _| Ok("tx_abc".to_string()));

        let persister = OnChainPersister::new(
            connected_connector().await,
            Arc::new(ledger),
            Duration::from_secs(5),
        );

        let tx = persister
            .store_complete_strategy(&saved("strategy_1_a"))
            .await
            .expect("提交失敗");
        assert_eq!(tx, "tx_abc");
    }

    #[tokio::test]
    async fn test_empty_id_rejected_before_ledger_contact() {
        let mut ledger = MockLedger::new();
        ledger.expect_submit().times(0);

        let persister = OnChainPersister::new(
            connected_connector().await,
            Arc::new(ledger),
            Duration::from_secs(5),
        );

        let result = persister.store_complete_strategy(&saved("")).await;
        assert_matches!(result, Err(PersistError::Ledger(LedgerError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_ledger_errors_pass_through_classified() {
        let mut ledger = MockLedger::new();
        ledger
            .expect_submit()
            .times(1)
            .returning(|_, _| Err(LedgerError::Rejected("user closed wallet".to_string())));

        let persister = OnChainPersister::new(
            connected_connector().await,
            Arc::new(ledger),
            Duration::from_secs(5),
        );

        let result = persister.store_complete_strategy(&saved("strategy_1_a")).await;
        assert_matches!(result, Err(PersistError::Ledger(LedgerError::Rejected(_))));
    }
}
