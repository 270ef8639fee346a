use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use strategy_vault::chain::{Ledger, LedgerResult, OnChainPersister, StrategyPayload};
use strategy_vault::execution::ExecutionTracker;
use strategy_vault::lifecycle::LifecycleCoordinator;
use strategy_vault::storage::{InMemoryRepository, StrategyPlan, StrategyStep, StrategyStore};
use strategy_vault::wallet::{
    keys, write_value, ClientStore, InMemoryClientStore, ProviderError, WalletConnector,
    WalletProvider, WalletProviderKind, WalletSession,
};

/// Build a sample plan the way the AI generation step would hand it over.
pub fn sample_plan() -> StrategyPlan {
    StrategyPlan {
        id: None,
        goal: "Maximize stablecoin yield across chains".to_string(),
        chains: vec!["near".to_string(), "ethereum".to_string()],
        protocols: vec!["ref-finance".to_string(), "aave".to_string()],
        steps: vec![StrategyStep {
            action: "deposit".to_string(),
            protocol: "ref-finance".to_string(),
            asset: "USDC".to_string(),
            amount: Some("1000".to_string()),
            expected_apy: Some(8.5),
        }],
        risk_level: "medium".to_string(),
        estimated_apy: Some(8.0),
        estimated_tvl: Some("2500000".to_string()),
        confidence: Some(0.82),
        reasoning: None,
        warnings: None,
    }
}

pub fn test_session(account: &str) -> WalletSession {
    WalletSession {
        provider: WalletProviderKind::Account,
        account_id: account.to_string(),
        balance: Some("100".to_string()),
        connected_at: Utc::now(),
    }
}

/// Configurable wallet provider double.
pub struct FakeWalletProvider {
    kind: WalletProviderKind,
    validate_result: bool,
    direct_delay: Duration,
    direct_calls: AtomicUsize,
}

impl FakeWalletProvider {
    pub fn account() -> Self {
        Self {
            kind: WalletProviderKind::Account,
            validate_result: true,
            direct_delay: Duration::ZERO,
            direct_calls: AtomicUsize::new(0),
        }
    }

    pub fn address() -> Self {
        Self {
            kind: WalletProviderKind::Address,
            validate_result: true,
            direct_delay: Duration::ZERO,
            direct_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_validate_result(mut self, result: bool) -> Self {
        self.validate_result = result;
        self
    }

    pub fn with_direct_delay(mut self, delay: Duration) -> Self {
        self.direct_delay = delay;
        self
    }

    pub fn direct_calls(&self) -> usize {
        self.direct_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for FakeWalletProvider {
    fn kind(&self) -> WalletProviderKind {
        self.kind
    }

    async fn connect_direct(&self) -> Result<WalletSession, ProviderError> {
        self.direct_calls.fetch_add(1, Ordering::SeqCst);
        if !self.direct_delay.is_zero() {
            tokio::time::sleep(self.direct_delay).await;
        }
        Ok(WalletSession {
            provider: self.kind,
            account_id: "0xabc123".to_string(),
            balance: None,
            connected_at: Utc::now(),
        })
    }

    fn authorization_url(&self) -> Result<Url, ProviderError> {
        Ok(Url::parse("https://wallet.example.org/login").expect("static url"))
    }

    async fn exchange_callback(&self, account_id: &str) -> Result<WalletSession, ProviderError> {
        Ok(WalletSession {
            provider: self.kind,
            account_id: account_id.to_string(),
            balance: Some("42".to_string()),
            connected_at: Utc::now(),
        })
    }

    async fn validate_session(&self, _session: &WalletSession) -> Result<bool, ProviderError> {
        Ok(self.validate_result)
    }

    async fn disconnect(&self, _session: &WalletSession) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Programmable ledger double that counts submissions.
pub struct FakeLedger {
    submissions: AtomicUsize,
    delay: Duration,
    behavior: Box<dyn Fn() -> LedgerResult<String> + Send + Sync>,
}

impl FakeLedger {
    pub fn succeeding(tx: &str) -> Self {
        let tx = tx.to_string();
        Self {
            submissions: AtomicUsize::new(0),
            delay: Duration::ZERO,
            behavior: Box::new(move || Ok(tx.clone())),
        }
    }

    pub fn failing_with<F>(behavior: F) -> Self
    where
        F: Fn() -> LedgerResult<String> + Send + Sync + 'static,
    {
        Self {
            submissions: AtomicUsize::new(0),
            delay: Duration::ZERO,
            behavior: Box::new(behavior),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn submit(
        &self,
        _payload: &StrategyPayload,
        _session: &WalletSession,
    ) -> LedgerResult<String> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.behavior)()
    }
}

/// Fully wired in-memory stack for lifecycle tests.
pub struct TestStack {
    pub store: Arc<StrategyStore>,
    pub tracker: Arc<ExecutionTracker>,
    pub connector: Arc<WalletConnector>,
    pub client_store: Arc<InMemoryClientStore>,
    pub coordinator: LifecycleCoordinator,
}

/// Build a stack around the given ledger and provider; `connected` seeds a
/// persisted session and revalidates it so the connector reports Connected.
pub async fn build_stack(
    ledger: Arc<FakeLedger>,
    provider: FakeWalletProvider,
    connected: bool,
) -> TestStack {
    let store = Arc::new(StrategyStore::new(Arc::new(InMemoryRepository::new())));
    let tracker = Arc::new(ExecutionTracker::new(store.clone()));
    let client_store = Arc::new(InMemoryClientStore::new());

    if connected {
        write_value(
            client_store.as_ref(),
            keys::WALLET_SESSION,
            &test_session("alice.test"),
        )
        .await
        .expect("failed to seed session");
    }

    let connector = Arc::new(WalletConnector::new(
        Arc::new(provider),
        client_store.clone() as Arc<dyn ClientStore>,
        Duration::from_millis(200),
        Duration::from_secs(600),
    ));
    if connected {
        connector.restore_on_load().await;
    }

    let persister = Arc::new(OnChainPersister::new(
        connector.clone(),
        ledger as Arc<dyn Ledger>,
        Duration::from_millis(200),
    ));
    let coordinator = LifecycleCoordinator::new(
        tracker.clone(),
        connector.clone(),
        persister,
        client_store.clone() as Arc<dyn ClientStore>,
        Duration::from_secs(600),
    );

    TestStack {
        store,
        tracker,
        connector,
        client_store,
        coordinator,
    }
}
