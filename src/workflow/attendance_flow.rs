//! 考勤查询流程 - 流程层
//!
//! 核心职责：定义一次完整查询的处理顺序
//!
//! 流程顺序：
//! 1. 登录（含验证码识别与有界重试）
//! 2. 抓取考勤数据
//! 3. 构建汇总报告
//!
//! 各步骤严格串行，前一步完成才开始下一步

use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::JsExecutor;
use crate::models::{Credentials, ReportSummary};
use crate::services::{AuthService, CaptchaSolver, ReportService, ScrapeService};

/// 考勤查询流程
///
/// - 编排完整的查询流程
/// - 不持有任何资源（page）
/// - 只依赖业务能力（services）
pub struct AttendanceFlow {
    auth_service: AuthService,
    scrape_service: ScrapeService,
    report_service: ReportService,
}

impl AttendanceFlow {
    /// 创建新的考勤查询流程
    pub fn new(config: &Config, credentials: &Credentials) -> Self {
        let solver = CaptchaSolver::new(config, credentials);
        Self {
            auth_service: AuthService::new(config, solver),
            scrape_service: ScrapeService::new(config),
            report_service: ReportService::new(config),
        }
    }

    /// 执行完整流程
    pub async fn run(
        &self,
        executor: &JsExecutor,
        credentials: &Credentials,
    ) -> AppResult<ReportSummary> {
        // ========== 阶段 1: 登录 ==========
        self.auth_service.login(executor, credentials).await?;

        // ========== 阶段 2: 抓取考勤 ==========
        let report = self.scrape_service.scrape(executor).await?;
        info!("✓ 抓取完成，共 {} 个科目", report.subjects.len());

        // ========== 阶段 3: 汇总 ==========
        Ok(self.report_service.build(&report))
    }
}
