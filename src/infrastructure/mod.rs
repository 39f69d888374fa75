//! 基础设施层
//!
//! 持有稀缺资源（Page / Browser），只向上暴露能力：
//! - `JsExecutor` - 附着页面的唯一 owner，提供 eval / 点击能力
//! - `TabDriver` - 开关标签页的能力抽象，`CdpTabDriver` 是 CDP 实现

pub mod js_executor;
pub mod tab_driver;

pub use js_executor::JsExecutor;
pub use tab_driver::{CdpTabDriver, TabDriver};
