//! 单个用户的取关流程 - 流程层
//!
//! 核心职责：定义"取关一个用户"的完整步骤
//!
//! 流程顺序：
//! 1. 新标签页打开对方主页
//! 2. 固定等待页面加载（没有就绪信号可依赖）
//! 3. 尝试点击取关按钮；点到了再等一段让操作生效
//! 4. 无条件关闭标签页（关不掉只记日志）
//!
//! 本层不持有 Browser，只依赖 TabDriver 能力；也不决定队列顺序。

use anyhow::Result;
use tokio::time::sleep;
use tracing::debug;

use crate::config::Pacing;
use crate::events::EventSender;
use crate::infrastructure::TabDriver;
use crate::models::ProfileSummary;

/// 对方主页上的取关按钮
const UNFOLLOW_BUTTON: &str = r#"[data-test="friend-added-button"]"#;

/// 单个用户的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    /// 按钮已点击
    Clicked,
    /// 页面上没找到取关按钮（不算失败，继续下一个）
    ButtonNotFound,
}

/// 取关流程
pub struct UnfollowFlow<'a, D: TabDriver> {
    driver: &'a D,
    pacing: &'a Pacing,
}

impl<'a, D: TabDriver> UnfollowFlow<'a, D> {
    /// 创建新的取关流程
    pub fn new(driver: &'a D, pacing: &'a Pacing) -> Self {
        Self { driver, pacing }
    }

    /// 对一个用户执行完整取关步骤
    pub async fn run(
        &self,
        user: &ProfileSummary,
        events: &EventSender,
    ) -> Result<UnfollowOutcome> {
        let tab = self.driver.open_tab(&user.profile_url).await?;
        debug!("已打开 {} 的主页", user.username);

        // 等页面加载：这里没有任何加载完成信号，只能保守地等
        sleep(self.pacing.settle).await;

        let click_result = self.driver.click(&tab, UNFOLLOW_BUTTON).await;

        let outcome = match click_result {
            Ok(true) => {
                events.success(format!("已点击取关按钮: {}", user.username));
                // 等操作在页面上生效
                sleep(self.pacing.confirm).await;
                UnfollowOutcome::Clicked
            }
            Ok(false) => {
                events.warning(format!("没找到取关按钮: {}", user.username));
                UnfollowOutcome::ButtonNotFound
            }
            Err(e) => {
                // 点击失败也要把标签页关掉
                if let Err(close_err) = self.driver.close_tab(tab).await {
                    events.warning(format!("关闭标签页失败: {}", close_err));
                }
                return Err(e);
            }
        };

        // 无条件关闭，关不掉只记日志
        if let Err(e) = self.driver.close_tab(tab).await {
            events.warning(format!("关闭标签页失败: {}", e));
        } else {
            debug!("已关闭 {} 的标签页", user.username);
        }

        Ok(outcome)
    }
}
