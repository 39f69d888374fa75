//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：连接浏览器、装配抓取器 / 队列处理器 / 协调器
//! 2. **展示端**：把事件流渲染成带时间戳的日志
//! 3. **命令循环**：从 stdin 读操作指令（analyze / clean / list / stop），
//!    相当于原型里的弹窗按钮
//! 4. **偏好管理**：max_unfollow 启动时读取，用户给出新值时写回

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::events::EventSender;
use crate::infrastructure::{CdpTabDriver, JsExecutor};
use crate::orchestrator::{processor, SessionCoordinator};
use crate::services::{FriendScraper, Settings, SettingsStore};
use crate::utils::logging;

/// 个人资料页的 URL 特征
const PROFILE_URL_MARKERS: &[&str] = &["/profile/", "/u/"];

/// 应用主结构
pub struct App {
    coordinator: SessionCoordinator<FriendScraper>,
    settings_store: SettingsStore,
    settings: Settings,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        // 事件流 → 展示端
        let (events, event_rx) = EventSender::channel();
        tokio::spawn(logging::run_display(event_rx));

        // 连接浏览器，附着到个人资料页
        let (browser, page) =
            browser::connect_to_browser_and_page(config.browser_debug_port, PROFILE_URL_MARKERS)
                .await?;

        // 协调器一侧：只拿附着页面
        let executor = JsExecutor::new(page);
        let scraper = FriendScraper::new(
            executor,
            config.scrape_waits,
            events.clone(),
            config.profile_base_url.clone(),
        );

        // 处理器一侧：Browser 句柄整个交给标签页驱动
        let driver = Arc::new(CdpTabDriver::new(browser));
        let processor_handle = processor::spawn(driver, config.pacing, events.clone());

        let coordinator = SessionCoordinator::new(scraper, processor_handle, events);

        // 读取持久化偏好
        let settings_store = SettingsStore::new(&config.settings_file);
        let settings = settings_store.load().await;
        info!("单次最多取关: {}", settings.max_unfollow);

        Ok(Self {
            coordinator,
            settings_store,
            settings,
        })
    }

    /// 运行命令循环
    pub async fn run(mut self) -> Result<()> {
        print_help();

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        while let Some(line) = lines.next_line().await? {
            let mut parts = line.split_whitespace();
            let command = match parts.next() {
                Some(cmd) => cmd,
                None => continue,
            };

            match command {
                "analyze" => self.do_analyze().await,
                "clean" => {
                    let max_arg = parts.next().map(str::parse::<usize>);
                    match max_arg {
                        Some(Err(_)) => warn!("clean 的参数必须是非负整数"),
                        Some(Ok(max)) => self.do_clean(Some(max)).await,
                        None => self.do_clean(None).await,
                    }
                }
                "list" => self.do_list().await,
                "stop" => self.coordinator.stop(),
                "quit" | "exit" => break,
                _ => print_help(),
            }
        }

        info!("程序结束");
        Ok(())
    }

    async fn do_analyze(&self) {
        match self.coordinator.analyze().await {
            Ok(stats) => {
                info!(
                    "✓ 分析完成: 关注 {} | 粉丝 {} | 未回关 {}",
                    stats.total_following, stats.total_followers, stats.extra_following
                );
            }
            Err(e) => error!("分析失败: {}", e),
        }
    }

    async fn do_clean(&mut self, max_arg: Option<usize>) {
        // 用户给出新值时写回偏好文件
        let max_unfollow = match max_arg {
            Some(max) => {
                if max != self.settings.max_unfollow {
                    self.settings.max_unfollow = max;
                    if let Err(e) = self.settings_store.save(&self.settings).await {
                        warn!("保存偏好设置失败: {}", e);
                    }
                }
                max
            }
            None => self.settings.max_unfollow,
        };

        info!("最多取关 {} 个用户...", max_unfollow);
        match self.coordinator.clean(max_unfollow).await {
            Ok(outcome) if outcome.background_started => {
                info!("✓ 后台取关已启动，共 {} 个用户", outcome.total_users);
            }
            Ok(_) => info!("✓ 没有需要取关的用户"),
            Err(e) => error!("取关失败: {}", e),
        }
    }

    async fn do_list(&self) {
        let pending = self.coordinator.list_pending().await;
        if pending.is_empty() {
            info!("当前没有待取关的用户（先运行 analyze）");
            return;
        }
        info!("待取关用户 ({} 个):", pending.len());
        for (i, user) in pending.iter().enumerate() {
            match &user.xp_text {
                Some(xp) => info!("  {}. {} (#{}) {}", i + 1, user.username, user.user_id, xp),
                None => info!("  {}. {} (#{})", i + 1, user.username, user.user_id),
            }
        }
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 关注列表整理");
    info!("📡 浏览器调试端口: {}", config.browser_debug_port);
    info!("{}", "=".repeat(60));
}

fn print_help() {
    info!("可用命令:");
    info!("  analyze    - 分析粉丝 / 关注列表");
    info!("  clean [n]  - 取关最多 n 个未回关用户（缺省用已保存的偏好）");
    info!("  list       - 显示待取关列表");
    info!("  stop       - 请求停止当前操作");
    info!("  quit       - 退出");
}
