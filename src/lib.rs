//! # Attendance Checker
//!
//! 一个自动登录学生门户并抓取考勤数据的 Rust 应用程序：
//! 自动识别登录验证码（LLM Vision），逐科目展开考勤详情，
//! 汇总出勤率并按阈值分级
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供导航 / 等待 / eval / 输入能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个文件一个能力
//! - `CredentialResolver` - 凭据解析（配置 → 环境变量 → 交互输入）
//! - `CaptchaSolver` - LLM 验证码识别
//! - `AuthService` - 自动登录（含有界重试）
//! - `ScrapeService` - 考勤数据抓取
//! - `ReportService` - 汇总报告构建
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义一次完整查询的处理流程
//! - `AttendanceFlow` - 流程编排（登录 → 抓取 → 汇总）
//!
//! ### ④ 编排层（Orchestration）
//! - `app` - 应用入口，管理浏览器资源的获取与释放
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use browser::launch_browser;
pub use config::{BrowserEngine, Config, Selectors};
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{AttendanceReport, AttendanceStatus, Credentials, ReportSummary, SubjectRecord};
pub use services::{AuthService, CaptchaSolver, CredentialResolver, ReportService, ScrapeService};
pub use workflow::AttendanceFlow;
