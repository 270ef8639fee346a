// time_utils.rs
//
// 提供時間轉換相關的工具函數，用於在持久化層和領域模型層之間轉換時間格式。
// 主要功能：
// 1. 毫秒時間戳與 DateTime<Utc> 的互相轉換
// 2. 計算某個時間點至今經過的秒數（用於各種過期判斷）

use chrono::{DateTime, TimeZone, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// 將 DateTime<Utc> 轉換為毫秒時間戳
pub fn datetime_to_timestamp_ms(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// 將毫秒時間戳轉換為 DateTime<Utc>
pub fn timestamp_ms_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts)
        .single()
        .unwrap_or_else(Utc::now)
}

/// 獲取當前系統時間的毫秒時間戳
pub fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// 計算 `since` 至 `now` 經過的秒數，`since` 在未來時返回 0
pub fn elapsed_secs(since: &DateTime<Utc>, now: &DateTime<Utc>) -> u64 {
    let secs = (*now - *since).num_seconds();
    if secs < 0 {
        0
    } else {
        secs as u64
    }
}
