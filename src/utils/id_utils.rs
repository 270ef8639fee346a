// id_utils.rs
//
// 提供不透明識別碼的生成工具。識別碼由毫秒時間戳加上隨機後綴組成，
// 時間部分保證粗粒度的單調性，隨機後綴使同一毫秒內的碰撞機率可以忽略。

use uuid::Uuid;

use crate::utils::time_utils::current_timestamp_ms;

/// 生成帶前綴的唯一識別碼，格式為 `{prefix}_{毫秒時間戳}_{8位隨機十六進制}`
pub fn generate_prefixed_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, current_timestamp_ms(), &suffix[..8])
}
