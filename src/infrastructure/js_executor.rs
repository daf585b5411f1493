//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露能力：
//! 导航、等待、执行 JS、点击、输入、截图
//!
//! 不认识凭据和考勤数据，不处理业务流程

use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{AppError, AppResult, BrowserError};

/// 元素轮询间隔
const POLL_INTERVAL_MS: u64 = 200;

/// JS 执行器
pub struct JsExecutor {
    page: Page,
    interaction_delay: Duration,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page, interaction_delay_ms: u64) -> Self {
        Self {
            page,
            interaction_delay: Duration::from_millis(interaction_delay_ms),
        }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 导航到指定 URL 并等待加载完成
    pub async fn goto(&self, url: &str) -> AppResult<()> {
        debug!("导航到: {}", url);
        self.page.goto(url).await.map_err(|e| {
            AppError::Browser(BrowserError::NavigationFailed {
                url: url.to_string(),
                source: Box::new(e),
            })
        })?;
        self.page.wait_for_navigation().await.map_err(|e| {
            AppError::Browser(BrowserError::NavigationFailed {
                url: url.to_string(),
                source: Box::new(e),
            })
        })?;
        Ok(())
    }

    /// 当前页面 URL
    pub async fn current_url(&self) -> AppResult<String> {
        let url = self.page.url().await?;
        Ok(url.unwrap_or_default())
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 在超时时间内等待选择器命中元素
    ///
    /// 以固定间隔轮询，超时返回 WaitTimeout
    pub async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> AppResult<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::wait_timeout(selector, timeout_ms));
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    /// 元素当前是否存在
    pub async fn exists(&self, selector: &str) -> bool {
        self.page.find_element(selector).await.is_ok()
    }

    /// 点击选择器命中的第一个元素
    pub async fn click(&self, selector: &str) -> AppResult<()> {
        let element = self.page.find_element(selector).await.map_err(|_| {
            AppError::Browser(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })
        })?;
        element.scroll_into_view().await?;
        element.click().await?;
        sleep(self.interaction_delay).await;
        Ok(())
    }

    /// 清空输入框后逐字符输入
    ///
    /// 逐字符带延迟输入，避免门户前端丢字符
    pub async fn clear_and_type(&self, selector: &str, text: &str) -> AppResult<()> {
        let clear_script = format!(
            r#"
            (function() {{
                const el = document.querySelector({selector});
                if (!el) return false;
                el.value = '';
                el.focus();
                return true;
            }})()
            "#,
            selector = js_string(selector),
        );
        let cleared: bool = self.eval_as(clear_script).await?;
        if !cleared {
            return Err(AppError::Browser(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            }));
        }

        let element = self.page.find_element(selector).await.map_err(|_| {
            AppError::Browser(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })
        })?;
        element.click().await?;
        for ch in text.chars() {
            element.type_str(ch.to_string()).await?;
            sleep(self.interaction_delay).await;
        }
        Ok(())
    }

    /// 读取元素属性
    pub async fn attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>> {
        let js_code = format!(
            r#"
            (function() {{
                const el = document.querySelector({selector});
                if (!el) return null;
                return el.getAttribute({name});
            }})()
            "#,
            selector = js_string(selector),
            name = js_string(name),
        );
        self.eval_as(js_code).await
    }

    /// 对元素截图（PNG 字节）
    pub async fn screenshot_element(&self, selector: &str) -> AppResult<Vec<u8>> {
        let element = self.page.find_element(selector).await.map_err(|_| {
            AppError::Browser(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })
        })?;
        let bytes = element.screenshot(CaptureScreenshotFormat::Png).await?;
        Ok(bytes)
    }
}

/// 把字符串编码为可以安全嵌入 JS 的字面量（含引号）
pub fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("input[name='txtCaptcha']"), r#""input[name='txtCaptcha']""#);
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_string("line\nbreak"), r#""line\nbreak""#);
    }
}
