//! 编排层
//!
//! ## 模块划分
//!
//! ### `coordinator` - 会话协调器
//! - 附着在用户的个人资料页上
//! - 对外暴露 analyze / clean / stop / list_pending 四个操作
//! - 持有三份瞬态集合（粉丝 / 关注 / 未回关）
//! - 单飞锁 `is_running` 拒绝并发操作
//!
//! ### `processor` - 后台取关队列处理器
//! - 独立的长驻任务，唯一会开关标签页的执行上下文
//! - 单飞锁 `is_processing` 拒绝重复启动
//! - 严格串行处理，条目之间检查协作式停止标志
//!
//! ### `messages` - 两个上下文之间的消息
//! - 带类型的命令枚举 + oneshot 回执，替代字符串 action 分发
//!
//! ### `app` - 应用入口
//! - 连浏览器、装配各层、跑 stdin 命令循环
//!
//! ## 层次关系
//!
//! ```text
//! app（装配 + 命令循环）
//!     ↓
//! coordinator（analyze / clean / stop / list）──消息──▶ processor（串行取关）
//!     ↓                                                    ↓
//! services（reconcile / 抓取 / 偏好）                workflow::UnfollowFlow
//!     ↓                                                    ↓
//! infrastructure（JsExecutor）                    infrastructure（TabDriver）
//! ```
//!
//! 两个上下文各有自己的单飞锁，互不排斥：协调器操作附着页面，
//! 处理器操作自己开的标签页，理论上可以同时跑，这是沿用原有行为的
//! 有意选择。

pub mod app;
pub mod coordinator;
pub mod messages;
pub mod processor;

pub use app::App;
pub use coordinator::SessionCoordinator;
pub use messages::{CleanOutcome, ProcessorCommand, StartAck};
pub use processor::ProcessorHandle;
