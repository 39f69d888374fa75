//! 业务能力层
//!
//! 描述"我能做什么"，不关心流程顺序：
//! - `reconciler` - 对比两份列表，算出未回关集合
//! - `friend_scraper` - 从个人资料页抓取粉丝 / 关注列表
//! - `settings_store` - 持久化用户偏好（max_unfollow）

pub mod friend_scraper;
pub mod reconciler;
pub mod settings_store;

pub use friend_scraper::{FriendScraper, FriendSource};
pub use reconciler::reconcile;
pub use settings_store::{Settings, SettingsStore};
