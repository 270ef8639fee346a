// lifecycle.rs - 生命週期協調模組
//
// 把存儲、追蹤、錢包與帳本串起來：檢查連接前置條件、提交快照，
// 並且只在結果明確後把它反映回執行歷史。

pub mod coordinator;

pub use coordinator::{ExecutionReceipt, LifecycleCoordinator, LifecycleError, LifecycleResult};
