//! 日志工具模块
//!
//! tracing 初始化，以及把事件流渲染成带时间戳日志行的展示端。

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::events::{LogLevel, UiEvent};

/// 初始化日志
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 展示端：消费事件流，渲染成日志
///
/// 日志行带 `[HH:MM:SS]` 时间戳，进度渲染成百分比，
/// 统计渲染成一行汇总。事件源退出后自然结束。
pub async fn run_display(mut rx: UnboundedReceiver<UiEvent>) {
    while let Some(event) = rx.recv().await {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        match event {
            UiEvent::Log { text, level } => match level {
                LogLevel::Info => info!("[{}] {}", stamp, text),
                LogLevel::Success => info!("[{}] ✓ {}", stamp, text),
                LogLevel::Warning => warn!("[{}] {}", stamp, text),
                LogLevel::Error => error!("[{}] {}", stamp, text),
            },
            UiEvent::Progress { current, total } => {
                let percentage = if total == 0 {
                    0
                } else {
                    (current * 100) / total
                };
                info!("[{}] 进度: {}/{} ({}%)", stamp, current, total, percentage);
            }
            UiEvent::Stats(stats) => {
                info!(
                    "[{}] 关注: {} | 粉丝: {} | 未回关: {}",
                    stamp, stats.total_following, stats.total_followers, stats.extra_following
                );
            }
        }
    }
}
