// utils.rs - 公共工具模組
//
// 提供各種通用的工具函數和輔助方法，用於簡化系統其他部分的代碼。

pub mod id_utils;
pub mod time_utils;

// 重新導出工具函數，使其可以通過 utils::function_name 直接訪問
pub use id_utils::generate_prefixed_id;
pub use time_utils::{
    current_timestamp_ms,
    datetime_to_timestamp_ms,
    elapsed_secs,
    timestamp_ms_to_datetime,
};
