use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::storage::models::SavedStrategy;
use crate::storage::repository::{RepositoryResult, StrategyCollectionRepository};

/// JSON 文件策略儲存庫實現
///
/// 集合持久化為單一 JSON 文件。寫入採取先寫臨時文件再改名的方式，
/// 避免中途失敗留下殘缺文件。
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// 創建新的 JSON 文件儲存庫
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

#[async_trait]
impl StrategyCollectionRepository for JsonFileRepository {
    async fn load_all(&self) -> RepositoryResult<Vec<SavedStrategy>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            // 文件尚不存在時視為空集合
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let strategies: Vec<SavedStrategy> = serde_json::from_str(&content)?;
        Ok(strategies)
    }

    async fn persist_all(&self, strategies: &[SavedStrategy]) -> RepositoryResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(strategies)?;
        let temp = self.temp_path();
        fs::write(&temp, content.as_bytes()).await?;
        fs::rename(&temp, &self.path).await?;

        Ok(())
    }
}
