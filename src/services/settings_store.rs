//! 偏好设置存储 - 业务能力层
//!
//! 只有一个持久化偏好：单次最多取关多少人（max_unfollow，默认 3）。
//! 启动时读取，用户在 clean 里给出新值时写回。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// 用户偏好
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// 单次 clean 最多取关的用户数
    #[serde(default = "default_max_unfollow")]
    pub max_unfollow: usize,
}

fn default_max_unfollow() -> usize {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_unfollow: default_max_unfollow(),
        }
    }
}

/// 偏好设置存储
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// 创建指向给定文件的存储
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// 读取偏好
    ///
    /// 文件不存在或损坏时回落到默认值，不视为错误。
    pub async fn load(&self) -> Settings {
        match fs::read_to_string(&self.path).await {
            Ok(content) => match toml::from_str::<Settings>(&content) {
                Ok(settings) => {
                    debug!("已加载偏好设置: {:?}", settings);
                    settings
                }
                Err(e) => {
                    warn!("偏好设置文件损坏，使用默认值 ({}): {}", self.path.display(), e);
                    Settings::default()
                }
            },
            Err(_) => {
                debug!("偏好设置文件不存在，使用默认值");
                Settings::default()
            }
        }
    }

    /// 写回偏好
    pub async fn save(&self, settings: &Settings) -> AppResult<()> {
        let content = toml::to_string_pretty(settings).map_err(AppError::serialize_failed)?;
        fs::write(&self.path, content)
            .await
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;
        debug!("偏好设置已保存至 {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "follow-harmonizer-test-{}-{}.toml",
            name,
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn test_missing_file_yields_default() {
        let store = SettingsStore::new(temp_settings_path("missing"));
        let settings = store.load().await;
        assert_eq!(settings.max_unfollow, 3);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let path = temp_settings_path("round-trip");
        let store = SettingsStore::new(&path);

        store
            .save(&Settings { max_unfollow: 7 })
            .await
            .expect("保存偏好设置失败");
        let loaded = store.load().await;
        assert_eq!(loaded.max_unfollow, 7);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_corrupt_file_yields_default() {
        let path = temp_settings_path("corrupt");
        tokio::fs::write(&path, "这不是 toml ===").await.unwrap();

        let store = SettingsStore::new(&path);
        let settings = store.load().await;
        assert_eq!(settings, Settings::default());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
