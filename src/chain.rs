// chain.rs - 鏈上持久化模組
//
// 負責把策略快照提交到外部帳本：帳本邊界接口、HTTP 閘道實現，
// 以及帶前置條件檢查與超時約束的持久化器。

pub mod ledger;
pub mod persister;
pub mod rpc;

// 重新導出常用類型
pub use ledger::{Ledger, LedgerError, LedgerResult, StrategyPayload};
pub use persister::{OnChainPersister, PersistError, PersistResult};
pub use rpc::HttpLedger;
