//! JS 执行器 - 基础设施层
//!
//! 持有附着页面这一稀缺资源，只暴露"执行 JS / 点击元素"的能力

use anyhow::Result;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() / try_click() 能力
/// - 不认识 ProfileSummary / Collection
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 尝试点击页面上第一个匹配选择器的元素
    ///
    /// # 返回
    /// 元素存在且已点击返回 true，找不到元素返回 false
    pub async fn try_click(&self, selector: &str) -> Result<bool> {
        let selector_json = serde_json::to_string(selector)?;
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({selector_json});
                if (el) {{
                    el.click();
                    return true;
                }}
                return false;
            }})()"#
        );
        self.eval_as::<bool>(js).await
    }

    /// 获取当前页面地址
    pub async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }
}
