//! # Follow Harmonizer
//!
//! 自动整理社交学习网站关注列表的小工具：抓出"我关注了但没回关我"
//! 的账号，在后台逐个打开对方主页取关。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page / Browser），只暴露能力
//! - `JsExecutor` - 附着页面的唯一 owner，提供 eval / 点击能力
//! - `TabDriver` - 开关标签页的能力抽象
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `reconcile` - 对比两份列表，算出未回关集合
//! - `FriendScraper` - 抓取粉丝 / 关注列表
//! - `SettingsStore` - 持久化 max_unfollow 偏好
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"取关一个用户"的完整步骤
//! - `UnfollowFlow` - 开标签页 → 等待 → 点按钮 → 等待 → 关标签页
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/coordinator` - 会话协调器（analyze / clean / stop / list）
//! - `orchestrator/processor` - 后台取关队列，独立执行上下文
//! - `orchestrator/app` - 装配 + stdin 命令循环
//!
//! 两个执行上下文（协调器、队列处理器）只靠 `orchestrator/messages`
//! 里带类型的命令和 `events` 里的事件流通信，不共享内存。

pub mod browser;
pub mod config;
pub mod error;
pub mod events;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::{Config, Pacing, ScrapeWaits};
pub use error::{AppError, AppResult, SessionError};
pub use events::{AnalyzeStats, EventSender, LogLevel, UiEvent};
pub use infrastructure::{CdpTabDriver, JsExecutor, TabDriver};
pub use models::{Collection, ProfileSummary};
pub use orchestrator::{App, CleanOutcome, ProcessorHandle, SessionCoordinator, StartAck};
pub use services::{reconcile, FriendScraper, FriendSource, Settings, SettingsStore};
pub use workflow::{UnfollowFlow, UnfollowOutcome};
