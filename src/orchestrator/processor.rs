//! 后台取关队列处理器 - 编排层
//!
//! 长驻后台任务，自己一个执行上下文，只通过消息和协调器往来。
//!
//! ## 行为
//!
//! 1. **接受任务**：`Start` 先按 max_unfollow 截断，再回执入队数量；
//!    已有任务在跑时立即回执冲突，排队中的队列不受影响
//! 2. **严格串行**：所有标签页都开在用户正在用的那个浏览器前台，
//!    并行导航会互相踩，所以一次只处理一个用户
//! 3. **单条失败不中断**：打开 / 点击 / 关闭任何一步失败都只记日志，
//!    继续下一个用户
//! 4. **协作式停止**：停止标志只在条目边界检查，从不打断进行中的
//!    等待或页面操作

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Pacing;
use crate::error::{AppError, AppResult, SessionError};
use crate::events::EventSender;
use crate::infrastructure::TabDriver;
use crate::models::ProfileSummary;
use crate::orchestrator::messages::{ProcessorCommand, StartAck};
use crate::workflow::{UnfollowFlow, UnfollowOutcome};

/// 队列处理器句柄
///
/// 协调器持有它来下发任务和请求停止；处理器本体在自己的任务里。
#[derive(Clone)]
pub struct ProcessorHandle {
    cmd_tx: mpsc::Sender<ProcessorCommand>,
    stop_flag: Arc<AtomicBool>,
}

impl ProcessorHandle {
    /// 下发一轮取关任务
    ///
    /// 立即返回：接受则带回截断后的数量，处理在后台异步进行；
    /// 已有任务在跑时返回冲突错误。
    pub async fn start(
        &self,
        users: Vec<ProfileSummary>,
        max_unfollow: usize,
    ) -> AppResult<StartAck> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(ProcessorCommand::Start {
                users,
                max_unfollow,
                reply: reply_tx,
            })
            .await
            .map_err(|_| AppError::Other("后台处理器已退出".to_string()))?;

        reply_rx
            .await
            .map_err(|_| AppError::Other("后台处理器没有回执".to_string()))?
    }

    /// 请求协作式停止
    ///
    /// 只设置标志，正在进行的条目会做完，下一个条目边界生效。
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

/// 启动队列处理器的长驻任务，返回句柄
pub fn spawn<D: TabDriver>(driver: Arc<D>, pacing: Pacing, events: EventSender) -> ProcessorHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<ProcessorCommand>(16);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let is_processing = Arc::new(AtomicBool::new(false));

    let task_stop = stop_flag.clone();
    tokio::spawn(async move {
        info!("后台取关处理器已就绪");
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                ProcessorCommand::Start {
                    users,
                    max_unfollow,
                    reply,
                } => {
                    // 单飞锁：运行中一律拒绝，不排队
                    if is_processing
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_err()
                    {
                        let _ = reply.send(Err(AppError::Session(SessionError::AlreadyRunning)));
                        continue;
                    }

                    task_stop.store(false, Ordering::SeqCst);

                    let mut queue = users;
                    queue.truncate(max_unfollow);
                    let total = queue.len();

                    let _ = reply.send(Ok(StartAck {
                        accepted: true,
                        total,
                    }));

                    events.info(format!("启动后台取关，共 {} 个用户", total));

                    tokio::spawn(run_queue(
                        driver.clone(),
                        queue,
                        pacing,
                        events.clone(),
                        task_stop.clone(),
                        is_processing.clone(),
                    ));
                }
            }
        }
        debug!("命令通道关闭，后台取关处理器退出");
    });

    ProcessorHandle { cmd_tx, stop_flag }
}

/// 串行处理一轮队列
///
/// 不管中途发生什么，退出前都要把单飞锁放掉。
async fn run_queue<D: TabDriver>(
    driver: Arc<D>,
    queue: Vec<ProfileSummary>,
    pacing: Pacing,
    events: EventSender,
    stop_flag: Arc<AtomicBool>,
    is_processing: Arc<AtomicBool>,
) {
    let total = queue.len();
    let mut processed = 0usize;

    let flow = UnfollowFlow::new(driver.as_ref(), &pacing);

    for user in queue {
        // 停止标志只在条目边界生效
        if stop_flag.load(Ordering::SeqCst) {
            events.warning("收到停止请求，取关提前结束");
            break;
        }

        events.info(format!(
            "取关中: {} (第 {}/{} 个)",
            user.username,
            processed + 1,
            total
        ));

        match flow.run(&user, &events).await {
            Ok(UnfollowOutcome::Clicked) => {
                debug!("已取关 {}", user.username);
            }
            Ok(UnfollowOutcome::ButtonNotFound) => {
                // flow 已发过警告，照常计入已处理
            }
            Err(e) => {
                // 单条失败不中断队列
                events.error(format!("取关 {} 失败: {}", user.username, e));
            }
        }

        processed += 1;
        events.progress(processed, total);

        // 条目之间的间隔
        if processed < total && !stop_flag.load(Ordering::SeqCst) {
            sleep(pacing.between).await;
        }
    }

    events.success(format!("取关完成，共处理 {}/{} 个用户", processed, total));
    is_processing.store(false, Ordering::SeqCst);
}
