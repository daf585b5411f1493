/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化全局日志
///
/// 默认级别 info，可通过 RUST_LOG 环境变量覆盖；
/// 重复调用是安全的（测试里每个用例都会调用）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 自动考勤查询");
    info!("🌐 浏览器引擎: {} (headless: {})", config.engine, config.headless);
    info!("📐 视口: {}x{}", config.viewport_width, config.viewport_height);
    info!("⏱️ 等待超时: {} ms, 交互间隔: {} ms", config.wait_timeout_ms, config.interaction_delay_ms);
    info!("{}", "=".repeat(60));
}

/// 记录程序结束信息
pub fn log_finished() {
    info!("{}", "=".repeat(60));
    info!(
        "✅ 全部完成，完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
