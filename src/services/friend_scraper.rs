//! 列表抓取 - 业务能力层
//!
//! 只负责"从个人资料页抓出粉丝 / 关注两份列表"的能力：
//! 打开弹窗 → 展开"显示更多" → 一次 JS 把条目原始内容取回来 →
//! Rust 侧逐条规整，坏条目跳过不报错 → 关弹窗。
//!
//! 所有"找不到按钮 / 找不到条目"都降级成空集合加一条警告，
//! 绝不让 analyze 因为页面改版直接失败。

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::ScrapeWaits;
use crate::events::EventSender;
use crate::infrastructure::JsExecutor;
use crate::models::{Collection, ProfileSummary};

/// 粉丝列表弹窗的打开按钮
const FOLLOWERS_BUTTON: &str = r#"span[data-test="friend-followers-list"]"#;
/// 关注列表弹窗的打开按钮
const FOLLOWING_BUTTON: &str = r#"span[data-test="friend-following-list"]"#;

/// 个人主页链接中的用户 ID 模式
const USER_ID_PATTERN: &str = r"/u/(\d+)";

/// 列表来源能力
///
/// 协调器只依赖这个 trait，测试里用固定数据的假实现替换真抓取。
#[async_trait]
pub trait FriendSource: Send + Sync {
    /// 当前附着页面是否是个人资料页
    async fn is_profile_page(&self) -> Result<bool>;

    /// 抓取粉丝列表
    async fn collect_followers(&self) -> Result<Collection>;

    /// 抓取关注列表
    async fn collect_following(&self) -> Result<Collection>;
}

/// 页面条目的原始抓取结果（由注入 JS 返回）
#[derive(Debug, Clone, Deserialize)]
struct RawEntry {
    /// 条目里找到的个人主页链接
    href: Option<String>,
    /// 条目的全部可见文本
    text: String,
    /// 头像地址（src 含 ssr-avatars/ 的 img）
    avatar: Option<String>,
    /// 经验值文本（class 含 points 的 div）
    xp: Option<String>,
}

/// 列表抓取器
pub struct FriendScraper {
    executor: JsExecutor,
    waits: ScrapeWaits,
    events: EventSender,
    base_url: String,
    id_pattern: Regex,
}

impl FriendScraper {
    /// 创建新的列表抓取器
    pub fn new(
        executor: JsExecutor,
        waits: ScrapeWaits,
        events: EventSender,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            waits,
            events,
            base_url: base_url.into(),
            // 模式是编译期常量，失败属于编程错误
            id_pattern: Regex::new(USER_ID_PATTERN).expect("用户 ID 模式应当合法"),
        }
    }

    /// 抓取一份列表的完整流程
    async fn collect_list(&self, opener_selector: &str, label: &str) -> Result<Collection> {
        self.events.info(format!("收集{}列表", label));

        // 打开弹窗
        let opened = self.executor.try_click(opener_selector).await?;
        if !opened {
            self.events
                .warning(format!("没找到\"{}\"按钮，返回空列表", label));
            return Ok(Collection::new());
        }
        self.events.success(format!("已打开\"{}\"弹窗", label));
        sleep(self.waits.modal_open).await;

        sleep(self.waits.render).await;

        // 展开"显示更多"（不存在就跳过）
        if self.try_show_more().await? {
            sleep(self.waits.show_more).await;
        }
        sleep(self.waits.list_ready).await;

        // 抓条目
        let users = self.scrape_entries().await?;
        self.events
            .success(format!("收集到 {} 个用户", users.len()));

        // 关弹窗
        self.close_modal().await?;
        sleep(self.waits.settle).await;

        Ok(users)
    }

    /// 点击"显示更多"按钮（存在则点击）
    async fn try_show_more(&self) -> Result<bool> {
        let clicked = self
            .executor
            .try_click(r#"button._1gEmM._7jW2t._3jvnF"#)
            .await?;
        if clicked {
            self.events.info("展开\"显示更多\"");
        }
        Ok(clicked)
    }

    /// 把所有条目的原始内容一次取回来
    async fn scrape_entries(&self) -> Result<Collection> {
        let raw_entries: Vec<RawEntry> = self
            .executor
            .eval_as(
                r#"(() => {
                    const out = [];
                    const entries = document.querySelectorAll('[data-test="friend-entry"]');
                    for (const entry of entries) {
                        let href = null;
                        if (entry.tagName === 'A' && entry.href) {
                            href = entry.href;
                        } else {
                            const link = entry.closest('a[href]') || entry.querySelector('a[href]');
                            if (link && link.href) href = link.href;
                        }
                        let avatar = null;
                        for (const img of entry.querySelectorAll('img')) {
                            const src = img.src || '';
                            if (src.includes('ssr-avatars/')) { avatar = src; break; }
                        }
                        let xp = null;
                        const xpEl = entry.querySelector('div[class*="points"]');
                        if (xpEl) xp = xpEl.textContent.trim();
                        out.push({ href: href, text: entry.textContent || '', avatar: avatar, xp: xp });
                    }
                    return out;
                })()"#,
            )
            .await?;

        debug!("找到 {} 个条目", raw_entries.len());

        let mut users = Collection::new();
        for raw in &raw_entries {
            match normalize_entry(raw, &self.id_pattern, &self.base_url) {
                Some(user) => {
                    // 同一用户重复出现时后到的覆盖先到的
                    users.insert(user.user_id.clone(), user);
                }
                None => {
                    warn!("跳过无法解析的条目: {:?}", truncate(&raw.text, 40));
                }
            }
        }
        Ok(users)
    }

    /// 关闭弹窗
    ///
    /// 优先点关闭图标，找不到就点弹窗外面（页面左上角）让它收起来。
    async fn close_modal(&self) -> Result<()> {
        self.executor
            .eval(
                r#"(() => {
                    const closeIcon = document.querySelector('img[src*="ed25a8cf69261b0c1e25b147f369f74a.svg"]');
                    if (closeIcon) {
                        closeIcon.click();
                        return true;
                    }
                    const outside = document.elementFromPoint(10, 10);
                    if (outside) outside.click();
                    return false;
                })()"#,
            )
            .await?;
        sleep(self.waits.modal_close).await;
        Ok(())
    }
}

#[async_trait]
impl FriendSource for FriendScraper {
    async fn is_profile_page(&self) -> Result<bool> {
        let url = self.executor.current_url().await?;
        Ok(url.contains("/profile/") || url.contains("/u/"))
    }

    async fn collect_followers(&self) -> Result<Collection> {
        self.collect_list(FOLLOWERS_BUTTON, "粉丝").await
    }

    async fn collect_following(&self) -> Result<Collection> {
        self.collect_list(FOLLOWING_BUTTON, "关注").await
    }
}

/// 把一条原始条目规整成 ProfileSummary
///
/// 规则沿用线上页面的结构：
/// - 链接里必须能按 `/u/(\d+)` 提取出用户 ID，否则整条跳过；
/// - 显示名取文本里第一个长度大于 1 且不以数字开头的行，
///   找不到就退回 `user_{id}`；
/// - profileUrl 一律用 ID 重新拼，不信任抓到的原始链接。
fn normalize_entry(raw: &RawEntry, id_pattern: &Regex, base_url: &str) -> Option<ProfileSummary> {
    let href = raw.href.as_deref()?;
    let user_id = id_pattern.captures(href)?.get(1)?.as_str().to_string();

    let username = raw
        .text
        .lines()
        .map(str::trim)
        .find(|line| line.chars().count() > 1 && !line.starts_with(|c: char| c.is_ascii_digit()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("user_{}", user_id));

    let xp_text = raw
        .xp
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Some(ProfileSummary {
        profile_url: ProfileSummary::profile_url_for(base_url, &user_id),
        user_id,
        username,
        avatar_url: raw.avatar.clone(),
        xp_text,
    })
}

/// 截断长文本用于日志显示
fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.duolingo.com";

    fn pattern() -> Regex {
        Regex::new(USER_ID_PATTERN).unwrap()
    }

    fn raw(href: Option<&str>, text: &str) -> RawEntry {
        RawEntry {
            href: href.map(str::to_string),
            text: text.to_string(),
            avatar: None,
            xp: None,
        }
    }

    #[test]
    fn test_normalize_extracts_id_and_username() {
        let entry = raw(
            Some("https://www.duolingo.com/u/123456"),
            "\n  Мария\n 1200 очков \n",
        );
        let user = normalize_entry(&entry, &pattern(), BASE).unwrap();
        assert_eq!(user.user_id, "123456");
        assert_eq!(user.username, "Мария");
        assert_eq!(user.profile_url, "https://www.duolingo.com/u/123456");
    }

    #[test]
    fn test_normalize_skips_entry_without_link() {
        assert!(normalize_entry(&raw(None, "有文本但没链接"), &pattern(), BASE).is_none());
    }

    #[test]
    fn test_normalize_skips_entry_with_foreign_link() {
        let entry = raw(Some("https://www.duolingo.com/learn"), "某个栏目");
        assert!(normalize_entry(&entry, &pattern(), BASE).is_none());
    }

    #[test]
    fn test_normalize_falls_back_to_generated_name() {
        // 所有行都以数字开头时退回 user_{id}
        let entry = raw(Some("https://www.duolingo.com/u/77"), "123\n456 XP");
        let user = normalize_entry(&entry, &pattern(), BASE).unwrap();
        assert_eq!(user.username, "user_77");
    }

    #[test]
    fn test_normalize_keeps_avatar_and_xp() {
        let mut entry = raw(Some("https://www.duolingo.com/u/9"), "Пётр");
        entry.avatar = Some("https://cdn/ssr-avatars/9.png".to_string());
        entry.xp = Some(" 950 XP ".to_string());
        let user = normalize_entry(&entry, &pattern(), BASE).unwrap();
        assert_eq!(user.avatar_url.as_deref(), Some("https://cdn/ssr-avatars/9.png"));
        assert_eq!(user.xp_text.as_deref(), Some("950 XP"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("短文本", 10), "短文本");
        assert_eq!(truncate("abcdefgh", 5), "abcde...");
    }
}
