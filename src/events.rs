//! 对外事件流
//!
//! 原型里日志 / 进度 / 统计是三种用字符串 action 区分的消息，
//! 这里收敛成一个带类型的事件枚举，经 unbounded channel 发给展示端。
//! 发送方从不因为展示端掉线而失败：接收端没了就静默丢弃。

use serde::Serialize;
use tokio::sync::mpsc;

/// 日志事件级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 一次分析的汇总统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeStats {
    /// 关注总数
    pub total_following: usize,
    /// 粉丝总数
    pub total_followers: usize,
    /// 未回关数量
    pub extra_following: usize,
}

/// 发往展示端的事件
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// 日志行
    Log { text: String, level: LogLevel },
    /// 队列进度
    Progress { current: usize, total: usize },
    /// 汇总统计
    Stats(AnalyzeStats),
}

/// 事件发送端
///
/// 可以随意 clone，协调器、队列处理器、抓取器各拿一份。
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl EventSender {
    /// 创建一对事件通道
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 发送任意事件
    pub fn send(&self, event: UiEvent) {
        // 展示端可能已经退出，丢弃即可
        let _ = self.tx.send(event);
    }

    /// 发送一条日志
    pub fn log(&self, level: LogLevel, text: impl Into<String>) {
        self.send(UiEvent::Log {
            text: text.into(),
            level,
        });
    }

    pub fn info(&self, text: impl Into<String>) {
        self.log(LogLevel::Info, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.log(LogLevel::Success, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.log(LogLevel::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.log(LogLevel::Error, text);
    }

    /// 发送队列进度
    pub fn progress(&self, current: usize, total: usize) {
        self.send(UiEvent::Progress { current, total });
    }

    /// 发送汇总统计
    pub fn stats(&self, stats: AnalyzeStats) {
        self.send(UiEvent::Stats(stats));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, mut rx) = EventSender::channel();
        tx.info("第一条");
        tx.progress(1, 3);
        tx.stats(AnalyzeStats {
            total_following: 4,
            total_followers: 2,
            extra_following: 2,
        });

        assert!(matches!(
            rx.recv().await,
            Some(UiEvent::Log { level: LogLevel::Info, .. })
        ));
        assert!(matches!(
            rx.recv().await,
            Some(UiEvent::Progress { current: 1, total: 3 })
        ));
        assert!(matches!(rx.recv().await, Some(UiEvent::Stats(s)) if s.extra_following == 2));
    }

    #[test]
    fn test_send_without_receiver_does_not_panic() {
        let (tx, rx) = EventSender::channel();
        drop(rx);
        tx.error("没有人听也不该炸");
        tx.progress(0, 0);
    }
}
