// storage.rs - 持久化模組
//
// 負責策略記錄的持久化：領域模型、可注入的儲存庫後端，
// 以及在其上提供 CRUD 與查詢操作的 StrategyStore。

pub mod models;
pub mod repository;
pub mod store;

// 重新導出常用類型
pub use models::{
    ExecutionRecord, ExecutionStatus, NewExecutionRecord, PerformanceMetrics, PerformanceUpdate,
    SavedStrategy, StrategyPatch, StrategyPlan, StrategyStatus, StrategyStep,
};
pub use repository::{
    InMemoryRepository, JsonFileRepository, RepositoryError, RepositoryResult,
    StrategyCollectionRepository,
};
pub use store::StrategyStore;
