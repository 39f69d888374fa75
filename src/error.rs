use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 会话操作错误（冲突 / 前置条件 / 停止）
    Session(SessionError),
    /// 文件操作错误
    File(FileError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Session(e) => write!(f, "会话错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Browser(e) => Some(e),
            AppError::Session(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 连接浏览器失败
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 打开标签页失败
    TabOpenFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 关闭标签页失败
    TabCloseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::ConnectionFailed { port, source } => {
                write!(f, "无法连接到浏览器 (端口: {}): {}", port, source)
            }
            BrowserError::TabOpenFailed { url, source } => {
                write!(f, "打开标签页 {} 失败: {}", url, source)
            }
            BrowserError::TabCloseFailed { source } => {
                write!(f, "关闭标签页失败: {}", source)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::ConnectionFailed { source, .. }
            | BrowserError::TabOpenFailed { source, .. }
            | BrowserError::TabCloseFailed { source }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 会话操作错误
///
/// 对应操作边界上的三种结果：冲突、前置条件失败、协作式停止。
/// 停止不算故障，但要和普通错误区分开，所以单独一个变体。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// 同一执行上下文中已有操作在运行
    AlreadyRunning,
    /// 当前页面不是个人资料页
    NotOnProfilePage,
    /// 操作被协作式停止
    Stopped,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadyRunning => write!(f, "已有任务在运行"),
            SessionError::NotOnProfilePage => write!(f, "当前不在个人资料页面"),
            SessionError::Stopped => write!(f, "操作已停止"),
        }
    }
}

impl std::error::Error for SessionError {}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 序列化失败
    SerializeFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::SerializeFailed { source } => {
                write!(f, "序列化失败: {}", source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::SerializeFailed { source }
            | FileError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other(format!("{:#}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建打开标签页错误
    pub fn tab_open_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::TabOpenFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建序列化错误
    pub fn serialize_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::File(FileError::SerializeFailed {
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否为"已有任务在运行"冲突
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Session(SessionError::AlreadyRunning))
    }

    /// 是否为协作式停止
    pub fn is_stopped(&self) -> bool {
        matches!(self, AppError::Session(SessionError::Stopped))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
