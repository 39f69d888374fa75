use anyhow::Result;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::AppError;

/// 连接到浏览器并选取要附着的页面
///
/// 用户先用 `--remote-debugging-port` 启动浏览器并登录目标网站，
/// 然后本程序通过调试端口附着上去。优先选 URL 里带有任一标记
/// （如 `/profile/`、`/u/`）的页面；找不到就退回第一个已打开的页面，
/// 一个页面都没有时新建空白页（是否真是个人资料页由 analyze 再校验）。
pub async fn connect_to_browser_and_page(
    port: u16,
    url_markers: &[&str],
) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    // 优先查找 URL 中包含标记的页面
    for p in pages.iter() {
        if let Ok(Some(page_url)) = p.url().await {
            debug!("检查页面: {}", page_url);
            if url_markers.iter().any(|marker| page_url.contains(marker)) {
                info!("✓ 找到目标页面: {}", page_url);
                return Ok((browser, p.clone()));
            }
        }
    }

    // 没有命中标记时退回第一个已打开的页面
    if let Some(first) = pages.into_iter().next() {
        info!("未找到个人资料页，附着到第一个已打开的页面");
        return Ok((browser, first));
    }

    // 一个页面都没有，创建空白页面
    debug!("创建空白页面");
    let new_page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建空白页面失败: {}", e);
        AppError::tab_open_failed("about:blank", e)
    })?;

    Ok((browser, new_page))
}
