mod common;

use assert_matches::assert_matches;
use common::{test_session, FakeWalletProvider};
use std::sync::Arc;
use std::time::Duration;
use strategy_vault::wallet::{
    keys, read_value, write_value, CallbackParams, CallbackResolution, ConnectOutcome,
    ConnectionState, ConnectorError, InMemoryClientStore, PendingConnection, WalletConnector,
};

fn connector(provider: Arc<FakeWalletProvider>, store: Arc<InMemoryClientStore>) -> WalletConnector {
    WalletConnector::new(
        provider,
        store,
        Duration::from_millis(100),
        Duration::from_secs(600),
    )
}

/// 重定向恢復：發起連接留下待定標記，帶 account_id 的著陸 URL
/// 解析為 Connected 且標記被清除。
#[tokio::test]
async fn redirect_connect_then_callback_recovers_session() {
    let store = Arc::new(InMemoryClientStore::new());
    let connector = connector(Arc::new(FakeWalletProvider::account()), store.clone());

    let outcome = connector.connect().await.expect("connect failed");
    assert_matches!(outcome, ConnectOutcome::RedirectInitiated { .. });

    let marker: Option<PendingConnection> =
        read_value(store.as_ref(), keys::PENDING_CONNECTION).await.expect("read failed");
    assert!(marker.is_some());

    let params =
        CallbackParams::from_url("http://localhost:3000/?account_id=alice.test").expect("parse failed");
    let resolution = connector.resume_from_callback(&params).await.expect("resume failed");

    match resolution {
        CallbackResolution::Session(session) => assert_eq!(session.account_id, "alice.test"),
        other => panic!("expected session, got {:?}", other),
    }
    assert_eq!(connector.connection_state().await, ConnectionState::Connected);

    let marker: Option<PendingConnection> =
        read_value(store.as_ref(), keys::PENDING_CONNECTION).await.expect("read failed");
    assert!(marker.is_none(), "pending marker must be cleared");
}

#[tokio::test]
async fn landing_without_marker_is_not_a_callback() {
    let connector = connector(
        Arc::new(FakeWalletProvider::account()),
        Arc::new(InMemoryClientStore::new()),
    );

    let params =
        CallbackParams::from_url("http://localhost:3000/?account_id=alice.test").expect("parse failed");
    let resolution = connector.resume_from_callback(&params).await.expect("resume failed");
    assert_matches!(resolution, CallbackResolution::NotAPendingCallback);
    assert_eq!(connector.connection_state().await, ConnectionState::Disconnected);
}

/// 直連授權對並發調用冪等：第二次調用不觸發第二次彈窗。
#[tokio::test]
async fn concurrent_direct_connects_share_one_attempt() {
    let provider = Arc::new(
        FakeWalletProvider::address().with_direct_delay(Duration::from_millis(30)),
    );
    let connector = connector(provider.clone(), Arc::new(InMemoryClientStore::new()));

    let (first, second) = tokio::join!(connector.connect(), connector.connect());

    let outcomes = [first.expect("connect failed"), second.expect("connect failed")];
    let connected = outcomes
        .iter()
        .filter(|o| matches!(o, ConnectOutcome::Connected(_)))
        .count();
    let pending = outcomes
        .iter()
        .filter(|o| matches!(o, ConnectOutcome::AlreadyConnecting))
        .count();

    assert_eq!(connected, 1);
    assert_eq!(pending, 1);
    assert_eq!(provider.direct_calls(), 1);
}

#[tokio::test]
async fn direct_connect_times_out_and_releases_state() {
    let provider = Arc::new(
        FakeWalletProvider::address().with_direct_delay(Duration::from_secs(5)),
    );
    let connector = connector(provider, Arc::new(InMemoryClientStore::new()));

    let result = connector.connect().await;
    assert_matches!(result, Err(ConnectorError::Timeout(_)));
    assert_eq!(connector.connection_state().await, ConnectionState::Disconnected);

    // 超時後可以再次發起連接
    let provider = Arc::new(FakeWalletProvider::address());
    let connector = WalletConnector::new(
        provider,
        Arc::new(InMemoryClientStore::new()),
        Duration::from_millis(100),
        Duration::from_secs(600),
    );
    assert_matches!(
        connector.connect().await.expect("connect failed"),
        ConnectOutcome::Connected(_)
    );
}

#[tokio::test]
async fn restore_on_load_revalidates_persisted_session() {
    let store = Arc::new(InMemoryClientStore::new());
    write_value(store.as_ref(), keys::WALLET_SESSION, &test_session("alice.test"))
        .await
        .expect("seed failed");

    let connector = connector(Arc::new(FakeWalletProvider::account()), store.clone());
    assert_eq!(connector.restore_on_load().await, ConnectionState::Connected);
    assert!(connector.is_wallet_connected().await);
}

#[tokio::test]
async fn failed_revalidation_resets_silently() {
    let store = Arc::new(InMemoryClientStore::new());
    write_value(store.as_ref(), keys::WALLET_SESSION, &test_session("alice.test"))
        .await
        .expect("seed failed");

    let connector = connector(
        Arc::new(FakeWalletProvider::account().with_validate_result(false)),
        store.clone(),
    );
    assert_eq!(connector.restore_on_load().await, ConnectionState::Disconnected);

    // 失效會話不得殘留在持久化存儲
    let session: Option<strategy_vault::wallet::WalletSession> =
        read_value(store.as_ref(), keys::WALLET_SESSION).await.expect("read failed");
    assert!(session.is_none());
}

#[tokio::test]
async fn disconnect_while_disconnected_is_a_noop_success() {
    let connector = connector(
        Arc::new(FakeWalletProvider::account()),
        Arc::new(InMemoryClientStore::new()),
    );

    connector.disconnect().await;
    connector.disconnect().await;
    assert_eq!(connector.connection_state().await, ConnectionState::Disconnected);
}
