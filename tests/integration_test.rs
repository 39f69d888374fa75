use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use follow_harmonizer::{
    connect_to_browser_and_page, orchestrator::processor, AppError, Collection, Config,
    EventSender, FriendSource, Pacing, ProfileSummary, SessionCoordinator, SessionError,
    TabDriver,
};

// ========== 测试辅助 ==========

fn user(id: &str, name: &str) -> ProfileSummary {
    ProfileSummary {
        user_id: id.to_string(),
        username: name.to_string(),
        profile_url: ProfileSummary::profile_url_for("https://www.duolingo.com", id),
        avatar_url: None,
        xp_text: None,
    }
}

fn collection(users: &[ProfileSummary]) -> Collection {
    users
        .iter()
        .map(|u| (u.user_id.clone(), u.clone()))
        .collect()
}

/// 轮询等待条件成立，超时就失败
async fn wait_until(mut cond: impl FnMut() -> bool, what: &str) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("等待超时: {}", what);
}

/// 等处理器回到空闲后再启动（上一轮收尾和下一次启动之间有毫秒级窗口）
async fn start_when_idle(
    handle: &follow_harmonizer::ProcessorHandle,
    users: Vec<ProfileSummary>,
    max_unfollow: usize,
) -> follow_harmonizer::StartAck {
    for _ in 0..200 {
        match handle.start(users.clone(), max_unfollow).await {
            Ok(ack) => return ack,
            Err(e) if e.is_conflict() => sleep(Duration::from_millis(10)).await,
            Err(e) => panic!("启动失败: {}", e),
        }
    }
    panic!("处理器一直没有回到空闲");
}

/// 假标签页驱动：记录开 / 点 / 关，按 URL 配置点击行为
#[derive(Default)]
struct FakeTabDriver {
    /// 按打开顺序记录的 URL
    opened: Mutex<Vec<String>>,
    closed: AtomicUsize,
    /// 这些 URL 上点击返回"没找到按钮"
    button_missing: HashSet<String>,
    /// 这些 URL 上点击直接报错
    click_fails: HashSet<String>,
    /// 设置后每次点击都要先取到一个许可（用来卡住队列）
    gate: Option<Arc<Semaphore>>,
}

impl FakeTabDriver {
    fn opened_urls(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl TabDriver for FakeTabDriver {
    type Tab = String;

    async fn open_tab(&self, url: &str) -> Result<String> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(url.to_string())
    }

    async fn click(&self, tab: &String, _selector: &str) -> Result<bool> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate 不应被关闭").forget();
        }
        if self.click_fails.contains(tab) {
            anyhow::bail!("模拟的脚本执行失败");
        }
        Ok(!self.button_missing.contains(tab))
    }

    async fn close_tab(&self, _tab: String) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 假列表来源：返回固定数据，可选地在收集阶段卡住
struct FakeFriendSource {
    followers: Collection,
    following: Collection,
    on_profile_page: bool,
    gate: Option<Arc<Semaphore>>,
}

impl FakeFriendSource {
    fn new(followers: Collection, following: Collection) -> Self {
        Self {
            followers,
            following,
            on_profile_page: true,
            gate: None,
        }
    }
}

#[async_trait]
impl FriendSource for FakeFriendSource {
    async fn is_profile_page(&self) -> Result<bool> {
        Ok(self.on_profile_page)
    }

    async fn collect_followers(&self) -> Result<Collection> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate 不应被关闭").forget();
        }
        Ok(self.followers.clone())
    }

    async fn collect_following(&self) -> Result<Collection> {
        Ok(self.following.clone())
    }
}

// ========== 队列处理器 ==========

#[tokio::test]
async fn test_processor_limit_zero_completes_immediately() {
    let driver = Arc::new(FakeTabDriver::default());
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver.clone(), Pacing::zero(), events);

    let users = vec![user("1", "a"), user("2", "b"), user("3", "c")];
    let ack = handle.start(users, 0).await.expect("启动不应失败");

    assert!(ack.accepted);
    assert_eq!(ack.total, 0);
    assert!(driver.opened_urls().is_empty());

    // 空队列立即完成并回到空闲：再次启动应被接受
    let ack2 = start_when_idle(&handle, vec![user("9", "z")], 0).await;
    assert_eq!(ack2.total, 0);
    assert!(driver.opened_urls().is_empty());
}

#[tokio::test]
async fn test_processor_truncates_to_limit_in_order() {
    let driver = Arc::new(FakeTabDriver::default());
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver.clone(), Pacing::zero(), events);

    let users = vec![
        user("1", "a"),
        user("2", "b"),
        user("3", "c"),
        user("4", "d"),
        user("5", "e"),
    ];
    let ack = handle.start(users.clone(), 3).await.unwrap();
    assert_eq!(ack.total, 3);

    wait_until(|| driver.closed.load(Ordering::SeqCst) == 3, "处理完 3 个用户").await;

    // 只有前 3 个，按输入顺序
    let expected: Vec<String> = users[..3].iter().map(|u| u.profile_url.clone()).collect();
    assert_eq!(driver.opened_urls(), expected);
    assert_eq!(driver.closed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_processor_rejects_second_start_while_running() {
    let gate = Arc::new(Semaphore::new(0));
    let driver = Arc::new(FakeTabDriver {
        gate: Some(gate.clone()),
        ..Default::default()
    });
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver.clone(), Pacing::zero(), events);

    let first = vec![user("1", "a"), user("2", "b")];
    let ack = handle.start(first.clone(), 2).await.unwrap();
    assert_eq!(ack.total, 2);

    // 第一个条目卡在点击上，第二次启动必须立即被拒绝
    wait_until(|| !driver.opened_urls().is_empty(), "第一个条目开始").await;
    let err = handle
        .start(vec![user("9", "z")], 1)
        .await
        .expect_err("运行中必须拒绝");
    assert!(matches!(
        err,
        AppError::Session(SessionError::AlreadyRunning)
    ));

    // 放行后跑完：队列内容不受第二次启动影响
    gate.add_permits(10);
    wait_until(|| driver.closed.load(Ordering::SeqCst) == 2, "第一轮结束").await;
    let expected: Vec<String> = first.iter().map(|u| u.profile_url.clone()).collect();
    assert_eq!(driver.opened_urls(), expected);

    // 回到空闲后可以再次启动
    let ack3 = start_when_idle(&handle, vec![user("9", "z")], 1).await;
    assert_eq!(ack3.total, 1);
}

#[tokio::test]
async fn test_processor_continues_after_button_not_found() {
    let mut driver = FakeTabDriver::default();
    driver
        .button_missing
        .insert("https://www.duolingo.com/u/2".to_string());
    let driver = Arc::new(driver);
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver.clone(), Pacing::zero(), events);

    let users = vec![user("1", "a"), user("2", "b"), user("3", "c")];
    handle.start(users, 3).await.unwrap();

    // 第 2 个没按钮也不能挡住第 3 个；全部条目都被尝试并关闭
    wait_until(|| driver.closed.load(Ordering::SeqCst) == 3, "三个条目全部处理").await;
    assert_eq!(driver.opened_urls().len(), 3);
}

#[tokio::test]
async fn test_processor_continues_after_click_error() {
    let mut driver = FakeTabDriver::default();
    driver
        .click_fails
        .insert("https://www.duolingo.com/u/1".to_string());
    let driver = Arc::new(driver);
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver.clone(), Pacing::zero(), events);

    let users = vec![user("1", "a"), user("2", "b")];
    handle.start(users, 2).await.unwrap();

    // 第 1 个报错，第 2 个照常处理；两个标签页都被关闭
    wait_until(|| driver.closed.load(Ordering::SeqCst) == 2, "两个条目全部处理").await;
    assert_eq!(driver.opened_urls().len(), 2);
}

#[tokio::test]
async fn test_processor_stop_between_items() {
    let gate = Arc::new(Semaphore::new(0));
    let driver = Arc::new(FakeTabDriver {
        gate: Some(gate.clone()),
        ..Default::default()
    });
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver.clone(), Pacing::zero(), events);

    let users = vec![user("1", "a"), user("2", "b"), user("3", "c")];
    handle.start(users, 3).await.unwrap();

    // 第一个条目进行中请求停止：当前条目做完，后面的不再开始
    wait_until(|| !driver.opened_urls().is_empty(), "第一个条目开始").await;
    handle.request_stop();
    gate.add_permits(10);

    wait_until(|| driver.closed.load(Ordering::SeqCst) == 1, "第一个条目收尾").await;
    // 给队列一点时间确认它不会继续
    sleep(Duration::from_millis(100)).await;
    assert_eq!(driver.opened_urls().len(), 1);

    // 处理器回到空闲
    let ack = start_when_idle(&handle, vec![user("9", "z")], 1).await;
    assert_eq!(ack.total, 1);
}

// ========== 会话协调器 ==========

fn sample_lists() -> (Collection, Collection) {
    let followers = collection(&[user("1", "a"), user("2", "b")]);
    let following = collection(&[
        user("1", "a"),
        user("2", "b"),
        user("3", "c"),
        user("4", "d"),
    ]);
    (followers, following)
}

#[tokio::test]
async fn test_coordinator_analyze_reports_stats() {
    let (followers, following) = sample_lists();
    let driver = Arc::new(FakeTabDriver::default());
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver, Pacing::zero(), events.clone());
    let coordinator =
        SessionCoordinator::new(FakeFriendSource::new(followers, following), handle, events);

    let stats = coordinator.analyze().await.expect("分析应当成功");
    assert_eq!(stats.total_following, 4);
    assert_eq!(stats.total_followers, 2);
    assert_eq!(stats.extra_following, 2);

    let pending = coordinator.list_pending().await;
    let ids: Vec<&str> = pending.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["3", "4"]);
}

#[tokio::test]
async fn test_coordinator_clean_is_bounded_and_optimistic() {
    let (followers, following) = sample_lists();
    let driver = Arc::new(FakeTabDriver::default());
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver.clone(), Pacing::zero(), events.clone());
    let coordinator =
        SessionCoordinator::new(FakeFriendSource::new(followers, following), handle, events);

    coordinator.analyze().await.unwrap();

    // clean(1) 只派发未回关集合里的第一个（id 3）
    let outcome = coordinator.clean(1).await.expect("clean 应当成功");
    assert!(outcome.background_started);
    assert_eq!(outcome.total_users, 1);
    assert_eq!(outcome.cleaned_count, 1);

    // 乐观记账：不等后台确认，本地集合立刻缩小
    let pending = coordinator.list_pending().await;
    let ids: Vec<&str> = pending.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["4"]);

    // 后台确实只处理了 id 3 的主页
    wait_until(|| driver.closed.load(Ordering::SeqCst) == 1, "后台处理完成").await;
    assert_eq!(
        driver.opened_urls(),
        vec!["https://www.duolingo.com/u/3".to_string()]
    );
}

#[tokio::test]
async fn test_coordinator_clean_runs_analyze_when_cache_empty() {
    let (followers, following) = sample_lists();
    let driver = Arc::new(FakeTabDriver::default());
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver.clone(), Pacing::zero(), events.clone());
    let coordinator =
        SessionCoordinator::new(FakeFriendSource::new(followers, following), handle, events);

    // 不先 analyze，clean 自己补一次分析
    let outcome = coordinator.clean(2).await.unwrap();
    assert!(outcome.background_started);
    assert_eq!(outcome.total_users, 2);

    wait_until(|| driver.closed.load(Ordering::SeqCst) == 2, "后台处理完成").await;
}

#[tokio::test]
async fn test_coordinator_clean_with_all_mutual_is_zero() {
    let followers = collection(&[user("1", "a"), user("2", "b")]);
    let following = followers.clone();
    let driver = Arc::new(FakeTabDriver::default());
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver.clone(), Pacing::zero(), events.clone());
    let coordinator =
        SessionCoordinator::new(FakeFriendSource::new(followers, following), handle, events);

    let outcome = coordinator.clean(3).await.unwrap();
    assert!(!outcome.background_started);
    assert_eq!(outcome.total_users, 0);
    assert_eq!(outcome.cleaned_count, 0);
    // 没有任何派发
    assert!(driver.opened_urls().is_empty());
}

#[tokio::test]
async fn test_coordinator_rejects_analyze_off_profile_page() {
    let (followers, following) = sample_lists();
    let mut source = FakeFriendSource::new(followers, following);
    source.on_profile_page = false;
    let driver = Arc::new(FakeTabDriver::default());
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver, Pacing::zero(), events.clone());
    let coordinator = SessionCoordinator::new(source, handle, events);

    let err = coordinator.analyze().await.expect_err("必须拒绝");
    assert!(matches!(
        err,
        AppError::Session(SessionError::NotOnProfilePage)
    ));
}

#[tokio::test]
async fn test_coordinator_rejects_concurrent_analyze() {
    let (followers, following) = sample_lists();
    let gate = Arc::new(Semaphore::new(0));
    let mut source = FakeFriendSource::new(followers, following);
    source.gate = Some(gate.clone());
    let driver = Arc::new(FakeTabDriver::default());
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver, Pacing::zero(), events.clone());
    let coordinator = Arc::new(SessionCoordinator::new(source, handle, events));

    // 第一个 analyze 卡在收集阶段
    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.analyze().await })
    };
    sleep(Duration::from_millis(50)).await;

    let err = coordinator.analyze().await.expect_err("必须拒绝并发操作");
    assert!(matches!(
        err,
        AppError::Session(SessionError::AlreadyRunning)
    ));

    gate.add_permits(1);
    let stats = first.await.unwrap().expect("第一个 analyze 应当完成");
    assert_eq!(stats.extra_following, 2);
}

#[tokio::test]
async fn test_coordinator_stop_yields_stopped_result() {
    let (followers, following) = sample_lists();
    let gate = Arc::new(Semaphore::new(0));
    let mut source = FakeFriendSource::new(followers, following);
    source.gate = Some(gate.clone());
    let driver = Arc::new(FakeTabDriver::default());
    let (events, _rx) = EventSender::channel();
    let handle = processor::spawn(driver, Pacing::zero(), events.clone());
    let coordinator = Arc::new(SessionCoordinator::new(source, handle, events));

    let analyze = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.analyze().await })
    };
    sleep(Duration::from_millis(50)).await;

    // 收集阶段进行中请求停止：不打断当前阶段，阶段边界生效
    coordinator.stop();
    gate.add_permits(1);

    let err = analyze.await.unwrap().expect_err("应当以停止结束");
    assert!(err.is_stopped());
}

// ========== 真实浏览器（需要手动运行） ==========

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    follow_harmonizer::utils::logging::init();

    let config = Config::from_env();

    let result =
        connect_to_browser_and_page(config.browser_debug_port, &["/profile/", "/u/"]).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore]
async fn test_live_analyze() {
    use follow_harmonizer::{orchestrator::processor, CdpTabDriver, FriendScraper, JsExecutor};

    follow_harmonizer::utils::logging::init();

    let config = Config::from_env();

    let (browser, page) =
        connect_to_browser_and_page(config.browser_debug_port, &["/profile/", "/u/"])
            .await
            .expect("连接浏览器失败");

    let (events, mut rx) = EventSender::channel();
    tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let scraper = FriendScraper::new(
        JsExecutor::new(page),
        config.scrape_waits,
        events.clone(),
        config.profile_base_url.clone(),
    );
    let driver = Arc::new(CdpTabDriver::new(browser));
    let handle = processor::spawn(driver, config.pacing, events.clone());
    let coordinator = SessionCoordinator::new(scraper, handle, events);

    let stats = coordinator.analyze().await.expect("分析失败");
    println!(
        "关注: {} | 粉丝: {} | 未回关: {}",
        stats.total_following, stats.total_followers, stats.extra_following
    );
}
