//! 协调器与队列处理器之间的消息
//!
//! 原型里跨上下文通信靠字符串 action 加松散字段，这里收敛成
//! 带类型的命令枚举，每条命令带一个 oneshot 回执通道。

use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::AppResult;
use crate::models::ProfileSummary;

/// 队列处理器接受任务后的回执
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAck {
    /// 任务是否被接受
    pub accepted: bool,
    /// 截断后实际入队的数量
    pub total: usize,
}

/// clean 操作的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanOutcome {
    /// 是否真的启动了后台取关
    pub background_started: bool,
    /// 派发给后台的用户数
    pub total_users: usize,
    /// 本次从本地集合中移除的数量（乐观记账）
    pub cleaned_count: usize,
}

/// 发往队列处理器的命令
#[derive(Debug)]
pub enum ProcessorCommand {
    /// 启动一轮后台取关
    Start {
        users: Vec<ProfileSummary>,
        max_unfollow: usize,
        reply: oneshot::Sender<AppResult<StartAck>>,
    },
}
