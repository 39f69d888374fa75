//! 会话协调器 - 编排层
//!
//! 附着在用户的个人资料页上，对外暴露四个操作：
//! analyze / clean / stop / list_pending。
//!
//! ## 状态
//!
//! 三份集合（粉丝、关注、未回关）都是瞬态的：每次 analyze 整体替换，
//! clean 派发后乐观地把派发条目从本地移除——后台实际成败不会写回来，
//! 本地状态可能和页面真实状态出现偏差，这是沿用原有行为的已知取舍。
//!
//! ## 并发
//!
//! 单飞锁 `is_running` 保证同一时刻只有一个 analyze / clean 在跑；
//! 停止标志独立于队列处理器的那一个，只在抓取阶段之间检查。

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::error::{AppError, AppResult, SessionError};
use crate::events::{AnalyzeStats, EventSender};
use crate::models::{Collection, ProfileSummary};
use crate::orchestrator::messages::CleanOutcome;
use crate::orchestrator::processor::ProcessorHandle;
use crate::services::friend_scraper::FriendSource;
use crate::services::reconciler::reconcile;

/// 一次分析周期内的三份集合
#[derive(Debug, Default)]
struct SessionState {
    followers: Collection,
    following: Collection,
    non_mutual: Collection,
}

/// 会话协调器
pub struct SessionCoordinator<S: FriendSource> {
    source: S,
    processor: ProcessorHandle,
    events: EventSender,
    is_running: AtomicBool,
    stop_requested: AtomicBool,
    state: Mutex<SessionState>,
}

impl<S: FriendSource> SessionCoordinator<S> {
    /// 创建新的会话协调器
    pub fn new(source: S, processor: ProcessorHandle, events: EventSender) -> Self {
        Self {
            source,
            processor,
            events,
            is_running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// 分析两份列表，得到未回关集合
    pub async fn analyze(&self) -> AppResult<AnalyzeStats> {
        self.begin()?;
        let result = self.analyze_inner().await;
        self.finish();
        result
    }

    /// 取关最多 `max_unfollow` 个未回关用户
    pub async fn clean(&self, max_unfollow: usize) -> AppResult<CleanOutcome> {
        self.begin()?;
        let result = self.clean_inner(max_unfollow).await;
        self.finish();
        result
    }

    /// 请求协作式停止
    ///
    /// 同时设置本地标志和队列处理器的标志；两个标志各自在下一个
    /// 阶段 / 条目边界生效，进行中的等待和页面操作不会被打断。
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.processor.request_stop();
        self.events.warning("停止请求已发出");
    }

    /// 当前未回关集合的快照
    pub async fn list_pending(&self) -> Vec<ProfileSummary> {
        self.state.lock().await.non_mutual.values().cloned().collect()
    }

    // ========== 单飞锁 ==========

    fn begin(&self) -> AppResult<()> {
        if self
            .is_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::Session(SessionError::AlreadyRunning));
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn finish(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    fn stop_observed(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    // ========== 操作本体（调用方已持有单飞锁） ==========

    async fn analyze_inner(&self) -> AppResult<AnalyzeStats> {
        self.events.info("开始分析");

        if !self.source.is_profile_page().await? {
            self.events.error("当前不在个人资料页面！");
            return Err(AppError::Session(SessionError::NotOnProfilePage));
        }

        self.events.info("1. 收集粉丝");
        let followers = self.source.collect_followers().await?;
        if followers.is_empty() {
            self.events.warning("粉丝列表为空");
        } else {
            self.events.info(format!("粉丝: {}", followers.len()));
        }

        if self.stop_observed() {
            self.events.warning("分析已停止");
            return Err(AppError::Session(SessionError::Stopped));
        }

        self.events.info("2. 收集关注");
        let following = self.source.collect_following().await?;
        if following.is_empty() {
            self.events.warning("关注列表为空");
        } else {
            self.events.info(format!("关注: {}", following.len()));
        }

        if self.stop_observed() {
            self.events.warning("分析已停止");
            return Err(AppError::Session(SessionError::Stopped));
        }

        self.events.info("3. 对比两份列表");
        let non_mutual = reconcile(&followers, &following);

        let stats = AnalyzeStats {
            total_following: following.len(),
            total_followers: followers.len(),
            extra_following: non_mutual.len(),
        };

        self.events.success("分析结果:");
        self.events.info(format!("   粉丝: {}", stats.total_followers));
        self.events.info(format!("   关注: {}", stats.total_following));
        if stats.extra_following > 0 {
            self.events
                .warning(format!("   未回关: {}", stats.extra_following));
            for (i, user) in non_mutual.values().enumerate() {
                self.events.warning(format!("   {}. {}", i + 1, user.username));
            }
        } else {
            self.events.success("   没有未回关的用户");
        }

        {
            let mut state = self.state.lock().await;
            state.followers = followers;
            state.following = following;
            state.non_mutual = non_mutual;
        }

        self.events.stats(stats);
        Ok(stats)
    }

    async fn clean_inner(&self, max_unfollow: usize) -> AppResult<CleanOutcome> {
        // 没有缓存的未回关集合就先做一次分析
        let need_analyze = self.state.lock().await.non_mutual.is_empty();
        if need_analyze {
            self.analyze_inner().await?;
        }

        // 截取最多 max_unfollow 个待取关用户
        let users: Vec<ProfileSummary> = {
            let state = self.state.lock().await;
            state.non_mutual.values().take(max_unfollow).cloned().collect()
        };

        if users.is_empty() {
            self.events.success("所有关注都是互相的！");
            return Ok(CleanOutcome {
                background_started: false,
                total_users: 0,
                cleaned_count: 0,
            });
        }

        self.events
            .warning(format!("取关 {} 个未回关用户", users.len()));
        for (i, user) in users.iter().enumerate() {
            self.events.info(format!("{}. {}", i + 1, user.username));
        }

        // 派发给后台处理器；冲突等同步失败直接返回，不动本地状态
        let ack = self.processor.start(users.clone(), max_unfollow).await?;
        self.events.success("后台取关已启动！");

        // 乐观记账：后台确认之前就从本地移除派发的条目。
        // 某个条目实际取关失败时本地状态会和页面偏差，下次 analyze 修正。
        let stats = {
            let mut state = self.state.lock().await;
            for user in &users {
                state.following.remove(&user.user_id);
                state.non_mutual.remove(&user.user_id);
            }
            AnalyzeStats {
                total_following: state.following.len(),
                total_followers: state.followers.len(),
                extra_following: state.non_mutual.len(),
            }
        };
        self.events.stats(stats);

        Ok(CleanOutcome {
            background_started: true,
            total_users: ack.total,
            cleaned_count: ack.total,
        })
    }
}
