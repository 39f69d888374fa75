//! 标签页驱动 - 基础设施层
//!
//! 取关队列需要的全部浏览器能力就三个：开标签页、点元素、关标签页。
//! 抽成 trait 之后队列处理器可以用假驱动 + 零等待来测试。

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use tracing::debug;

use crate::error::{AppError, BrowserError};

/// 标签页驱动能力
#[async_trait]
pub trait TabDriver: Send + Sync + 'static {
    /// 一个已打开的标签页句柄
    type Tab: Send;

    /// 打开新标签页并导航到指定地址
    async fn open_tab(&self, url: &str) -> Result<Self::Tab>;

    /// 尝试点击标签页中第一个匹配选择器的元素
    ///
    /// # 返回
    /// 元素存在且已点击返回 true，找不到元素返回 false
    async fn click(&self, tab: &Self::Tab, selector: &str) -> Result<bool>;

    /// 关闭标签页
    async fn close_tab(&self, tab: Self::Tab) -> Result<()>;
}

/// 基于 CDP 的标签页驱动
///
/// 唯一持有 Browser 句柄的地方：只有后台取关任务会开关标签页，
/// 协调器那边只拿着自己附着的 Page。
pub struct CdpTabDriver {
    browser: Browser,
}

impl CdpTabDriver {
    /// 创建新的标签页驱动
    pub fn new(browser: Browser) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl TabDriver for CdpTabDriver {
    type Tab = Page;

    async fn open_tab(&self, url: &str) -> Result<Page> {
        debug!("打开标签页: {}", url);
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| AppError::tab_open_failed(url, e))?;
        Ok(page)
    }

    async fn click(&self, tab: &Page, selector: &str) -> Result<bool> {
        let selector_json = serde_json::to_string(selector)?;
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({selector_json});
                if (el) {{
                    el.click();
                    return true;
                }}
                return false;
            }})()"#
        );
        let result = tab.evaluate(js).await.map_err(AppError::from)?;
        let clicked: bool = result.into_value()?;
        Ok(clicked)
    }

    async fn close_tab(&self, tab: Page) -> Result<()> {
        tab.close().await.map_err(|e| {
            AppError::Browser(BrowserError::TabCloseFailed {
                source: Box::new(e),
            })
        })?;
        debug!("标签页已关闭");
        Ok(())
    }
}
