// 重新導出子模塊
pub mod strategy;

// 重新導出常用類型
pub use strategy::{
    ExecutionRecord, ExecutionStatus, NewExecutionRecord, PerformanceMetrics, PerformanceUpdate,
    SavedStrategy, StrategyPatch, StrategyPlan, StrategyStatus, StrategyStep,
};
