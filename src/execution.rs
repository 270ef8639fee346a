// execution.rs - 執行追蹤模組
//
// 負責策略執行歷史的追加與聚合狀態的推導。

pub mod tracker;

pub use tracker::ExecutionTracker;
