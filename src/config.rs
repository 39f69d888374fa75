use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 个人主页地址前缀（用于拼接 profileUrl）
    pub profile_base_url: String,
    /// 用户偏好设置文件路径
    pub settings_file: String,
    /// 取关队列的节奏参数
    pub pacing: Pacing,
    /// 列表抓取的页面等待参数
    pub scrape_waits: ScrapeWaits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            profile_base_url: "https://www.duolingo.com".to_string(),
            settings_file: "harmonizer_settings.toml".to_string(),
            pacing: Pacing::default(),
            scrape_waits: ScrapeWaits::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.browser_debug_port),
            profile_base_url: std::env::var("PROFILE_BASE_URL")
                .unwrap_or(default.profile_base_url),
            settings_file: std::env::var("SETTINGS_FILE").unwrap_or(default.settings_file),
            pacing: Pacing::from_env(),
            scrape_waits: default.scrape_waits,
        }
    }
}

/// 取关队列的节奏参数
///
/// 目标页面没有任何"加载完成"信号可用，所以用保守的固定等待来代替
/// 事件驱动的就绪检查。三个时长都可以通过环境变量注入，测试时设为 0。
#[derive(Clone, Copy, Debug)]
pub struct Pacing {
    /// 打开目标页面后的稳定等待
    pub settle: Duration,
    /// 点击取关按钮后的确认等待
    pub confirm: Duration,
    /// 相邻两个用户之间的间隔
    pub between: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(10),
            confirm: Duration::from_secs(5),
            between: Duration::from_secs(2),
        }
    }
}

impl Pacing {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            settle: env_millis("SETTLE_WAIT_MS").unwrap_or(default.settle),
            confirm: env_millis("CONFIRM_WAIT_MS").unwrap_or(default.confirm),
            between: env_millis("BETWEEN_WAIT_MS").unwrap_or(default.between),
        }
    }

    /// 全零节奏，仅用于测试
    pub fn zero() -> Self {
        Self {
            settle: Duration::ZERO,
            confirm: Duration::ZERO,
            between: Duration::ZERO,
        }
    }
}

/// 列表抓取的页面等待参数
///
/// 默认值来自线上页面的实际表现：弹窗动画、列表渲染、"显示更多"
/// 加载都需要时间，数值偏保守。
#[derive(Clone, Copy, Debug)]
pub struct ScrapeWaits {
    /// 点击"粉丝/关注"按钮后等弹窗打开
    pub modal_open: Duration,
    /// 弹窗打开后等列表渲染
    pub render: Duration,
    /// 点击"显示更多"后等追加内容
    pub show_more: Duration,
    /// 抓取前的最终等待
    pub list_ready: Duration,
    /// 关闭弹窗后的等待
    pub modal_close: Duration,
    /// 两次抓取之间的缓冲
    pub settle: Duration,
}

impl Default for ScrapeWaits {
    fn default() -> Self {
        Self {
            modal_open: Duration::from_secs(2),
            render: Duration::from_secs(3),
            show_more: Duration::from_secs(3),
            list_ready: Duration::from_secs(4),
            modal_close: Duration::from_secs(1),
            settle: Duration::from_secs(2),
        }
    }
}

impl ScrapeWaits {
    /// 全零等待，仅用于测试
    pub fn zero() -> Self {
        Self {
            modal_open: Duration::ZERO,
            render: Duration::ZERO,
            show_more: Duration::ZERO,
            list_ready: Duration::ZERO,
            modal_close: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

fn env_millis(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}
