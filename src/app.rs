use anyhow::Result;
use chromiumoxide::Browser;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser::launch_browser;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::Credentials;
use crate::services::CredentialResolver;
use crate::utils::logging;
use crate::workflow::AttendanceFlow;

/// 应用主结构
///
/// 编排层：持有浏览器资源，保证所有退出路径都会释放
pub struct App {
    config: Config,
    credentials: Credentials,
    browser: Browser,
    handler_task: JoinHandle<()>,
    executor: JsExecutor,
}

impl App {
    /// 初始化应用：解析凭据并启动浏览器
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        // 先解析凭据：此时浏览器尚未启动，失败了无需清理
        let credentials = CredentialResolver::new(&config).resolve()?;

        let (browser, page, handler_task) = launch_browser(&config).await?;
        let executor = JsExecutor::new(page, config.interaction_delay_ms);

        Ok(Self {
            config,
            credentials,
            browser,
            handler_task,
            executor,
        })
    }

    /// 运行应用主逻辑
    ///
    /// 流程无论成功失败，浏览器会话都会在返回前关闭
    pub async fn run(mut self) -> Result<()> {
        let flow = AttendanceFlow::new(&self.config, &self.credentials);
        let result = flow.run(&self.executor, &self.credentials).await;

        self.shutdown().await;

        let summary = result?;
        println!("{}", summary);
        logging::log_finished();
        Ok(())
    }

    /// 关闭浏览器并终止事件处理任务
    async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
        self.handler_task.abort();
        info!("🧹 浏览器会话已关闭");
    }
}
