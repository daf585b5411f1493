use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::{BrowserEngine, Config};
use crate::error::{AppError, AppResult, BrowserError};

/// 启动浏览器并创建初始页面
///
/// 浏览器二进制不可用属于致命错误，直接上抛，不做重试
pub async fn launch_browser(config: &Config) -> AppResult<(Browser, Page, JoinHandle<()>)> {
    // chromiumoxide 走 CDP 协议，只能驱动 Chromium 系浏览器
    if config.engine != BrowserEngine::Chromium {
        return Err(AppError::Browser(BrowserError::UnsupportedEngine {
            engine: config.engine.name().to_string(),
        }));
    }

    info!("🚀 正在启动浏览器 (headless: {})...", config.headless);

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport_width, config.viewport_height)
        .request_timeout(Duration::from_millis(config.wait_timeout_ms))
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage", // 防止共享内存不足
            "--no-first-run",
            "--no-default-browser-check",
        ]);

    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    let browser_config = builder.build().map_err(|message| {
        error!("配置浏览器失败: {}", message);
        AppError::Browser(BrowserError::ConfigurationFailed { message })
    })?;

    // 启动浏览器
    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AppError::browser_launch_failed(e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    // 创建初始页面
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        AppError::Browser(BrowserError::PageCreationFailed { source: Box::new(e) })
    })?;

    info!("✅ 浏览器会话就绪");
    Ok((browser, page, handler_task))
}
