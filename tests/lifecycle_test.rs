mod common;

use assert_matches::assert_matches;
use common::{build_stack, sample_plan, FakeLedger, FakeWalletProvider};
use std::sync::Arc;
use std::time::Duration;
use strategy_vault::chain::LedgerError;
use strategy_vault::lifecycle::LifecycleError;
use strategy_vault::storage::{ExecutionStatus, StrategyStatus};
use strategy_vault::wallet::CallbackParams;

/// 錢包未連接時 execute 返回前置條件失敗，存儲不被觸碰，帳本不被聯繫。
#[tokio::test]
async fn execute_without_wallet_fails_fast() {
    let ledger = Arc::new(FakeLedger::succeeding("tx_1"));
    let stack = build_stack(ledger.clone(), FakeWalletProvider::account(), false).await;

    let saved = stack.store.save(sample_plan(), "s", None).await.expect("save failed");
    let result = stack.coordinator.execute(&saved).await;

    assert_matches!(result, Err(LifecycleError::WalletRequired));
    assert_eq!(ledger.submissions(), 0);

    let unchanged = stack.store.get_by_id(&saved.id).await.expect("strategy should exist");
    assert!(unchanged.execution_history.is_empty());
    assert_eq!(unchanged.status, StrategyStatus::Saved);
}

/// 成功路徑：帳本返回交易哈希，歷史追加一筆 completed 記錄。
#[tokio::test]
async fn successful_execute_records_completed() {
    let ledger = Arc::new(FakeLedger::succeeding("tx_success"));
    let stack = build_stack(ledger.clone(), FakeWalletProvider::account(), true).await;

    let saved = stack.store.save(sample_plan(), "s", None).await.expect("save failed");
    let receipt = stack.coordinator.execute(&saved).await.expect("execute failed");

    assert_eq!(receipt.transaction_hash, "tx_success");
    assert_eq!(ledger.submissions(), 1);

    let updated = stack.store.get_by_id(&saved.id).await.expect("strategy should exist");
    assert_eq!(updated.status, StrategyStatus::Completed);
    assert_eq!(updated.execution_history.len(), 1);
    assert_eq!(updated.execution_history[0].status, ExecutionStatus::Completed);
    assert_eq!(
        updated.execution_history[0].transaction_hash.as_deref(),
        Some("tx_success")
    );
}

/// 單飛守衛：同一策略的兩次並發 execute 只產生一次帳本提交。
#[tokio::test]
async fn concurrent_executes_submit_once() {
    let ledger = Arc::new(
        FakeLedger::succeeding("tx_single").with_delay(Duration::from_millis(30)),
    );
    let stack = build_stack(ledger.clone(), FakeWalletProvider::account(), true).await;

    let saved = stack.store.save(sample_plan(), "s", None).await.expect("save failed");
    let (first, second) = tokio::join!(
        stack.coordinator.execute(&saved),
        stack.coordinator.execute(&saved)
    );

    let results = [first, second];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let in_flight = results
        .iter()
        .filter(|r| matches!(r, Err(LifecycleError::AlreadyInFlight(_))))
        .count();

    assert_eq!(ok, 1);
    assert_eq!(in_flight, 1);
    assert_eq!(ledger.submissions(), 1);
}

/// 瞬時的網路失敗不寫入歷史，守衛釋放後可以重試。
#[tokio::test]
async fn transient_failure_leaves_history_untouched() {
    let ledger = Arc::new(FakeLedger::failing_with(|| {
        Err(LedgerError::Network("gateway unreachable".to_string()))
    }));
    let stack = build_stack(ledger.clone(), FakeWalletProvider::account(), true).await;

    let saved = stack.store.save(sample_plan(), "s", None).await.expect("save failed");

    let result = stack.coordinator.execute(&saved).await;
    assert_matches!(result, Err(LifecycleError::Ledger(LedgerError::Network(_))));

    let unchanged = stack.store.get_by_id(&saved.id).await.expect("strategy should exist");
    assert!(unchanged.execution_history.is_empty());
    assert_eq!(unchanged.status, StrategyStatus::Saved);

    // 守衛已釋放：重試會再次到達帳本
    let retry = stack.coordinator.execute(&saved).await;
    assert!(retry.is_err());
    assert_eq!(ledger.submissions(), 2);
}

/// 不可重試的拒絕寫入一筆 failed 記錄，策略狀態轉為 failed。
#[tokio::test]
async fn fatal_failure_records_failed() {
    let ledger = Arc::new(FakeLedger::failing_with(|| {
        Err(LedgerError::Rejected("user declined in wallet".to_string()))
    }));
    let stack = build_stack(ledger.clone(), FakeWalletProvider::account(), true).await;

    let saved = stack.store.save(sample_plan(), "s", None).await.expect("save failed");

    let result = stack.coordinator.execute(&saved).await;
    assert_matches!(result, Err(LifecycleError::Ledger(LedgerError::Rejected(_))));

    let updated = stack.store.get_by_id(&saved.id).await.expect("strategy should exist");
    assert_eq!(updated.status, StrategyStatus::Failed);
    assert_eq!(updated.execution_history.len(), 1);
    assert_eq!(updated.execution_history[0].status, ExecutionStatus::Failed);
    assert!(updated.execution_history[0]
        .error_message
        .as_deref()
        .expect("error message should be set")
        .contains("user declined"));
}

/// 重定向式提交：進程內超時後留下待定執行標記，帶 transactionHashes
/// 的著陸 URL 在下次加載時補記 completed。
#[tokio::test]
async fn redirect_submission_resumes_from_callback() {
    // 提交耗時遠超持久化器超時，模擬經由錢包導航離開的場景
    let ledger = Arc::new(
        FakeLedger::succeeding("ignored").with_delay(Duration::from_secs(5)),
    );
    let stack = build_stack(ledger.clone(), FakeWalletProvider::account(), true).await;

    let saved = stack.store.save(sample_plan(), "s", None).await.expect("save failed");

    let result = stack.coordinator.execute(&saved).await;
    assert_matches!(result, Err(LifecycleError::Ledger(LedgerError::Timeout(_))));

    // 超時不寫入歷史
    let pending = stack.store.get_by_id(&saved.id).await.expect("strategy should exist");
    assert!(pending.execution_history.is_empty());

    // 著陸 URL 攜帶交易哈希，補記完成
    let params = CallbackParams::from_url(
        "http://localhost:3000/?transactionHashes=tx_from_wallet",
    )
    .expect("parse failed");
    let receipt = stack
        .coordinator
        .resume_from_callback(&params)
        .await
        .expect("resume failed")
        .expect("receipt expected");

    assert_eq!(receipt.strategy_id, saved.id);
    assert_eq!(receipt.transaction_hash, "tx_from_wallet");

    let completed = stack.store.get_by_id(&saved.id).await.expect("strategy should exist");
    assert_eq!(completed.status, StrategyStatus::Completed);
    assert_eq!(completed.execution_history.len(), 1);

    // 標記已消費：重複著陸不再補記
    let again = stack
        .coordinator
        .resume_from_callback(&params)
        .await
        .expect("resume failed");
    assert!(again.is_none());
}

/// 沒有待定標記時，交易哈希著陸被忽略。
#[tokio::test]
async fn callback_without_marker_is_ignored() {
    let ledger = Arc::new(FakeLedger::succeeding("tx"));
    let stack = build_stack(ledger, FakeWalletProvider::account(), true).await;

    let params = CallbackParams::from_url("http://localhost:3000/?transactionHashes=tx_x")
        .expect("parse failed");
    let receipt = stack
        .coordinator
        .resume_from_callback(&params)
        .await
        .expect("resume failed");
    assert!(receipt.is_none());
}
