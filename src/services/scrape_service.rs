//! 考勤抓取 - 业务能力层
//!
//! 逐个展开科目详情面板，读取"开课 / 出勤"数值对。
//! 展开一个面板会影响页面布局，所以必须串行处理，
//! 也必须在任何点击之前先把全部科目名称提取出来。
//!
//! 单行解析失败只记录告警并跳过该行，不中断整次运行

use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, Selectors};
use crate::error::{AppError, AppResult, AuthError, ScrapeError};
use crate::infrastructure::js_executor::js_string;
use crate::infrastructure::JsExecutor;
use crate::models::{AttendanceReport, SubjectRecord};

/// 展开详情面板后等待渲染的最短时间
const DETAIL_RENDER_DELAY_MS: u64 = 300;

/// 考勤抓取服务
pub struct ScrapeService {
    attendance_url: String,
    wait_timeout_ms: u64,
    interaction_delay_ms: u64,
    selectors: Selectors,
}

impl ScrapeService {
    /// 创建新的考勤抓取服务
    pub fn new(config: &Config) -> Self {
        Self {
            attendance_url: config.attendance_url.clone(),
            wait_timeout_ms: config.wait_timeout_ms,
            interaction_delay_ms: config.interaction_delay_ms,
            selectors: config.selectors.clone(),
        }
    }

    /// 抓取考勤页的全部科目数据
    pub async fn scrape(&self, executor: &JsExecutor) -> AppResult<AttendanceReport> {
        info!("📋 正在打开考勤页: {}", self.attendance_url);
        executor.goto(&self.attendance_url).await?;

        // 会话过期会被重定向回登录页
        let url = executor.current_url().await?;
        if url.to_lowercase().contains("login") {
            return Err(AppError::Auth(AuthError::SessionExpired { url }));
        }

        // 等待科目列表出现；整页没有科目时按空报告处理，不算错误
        if let Err(e) = executor
            .wait_for_element(&self.selectors.expand_icon, self.wait_timeout_ms)
            .await
        {
            warn!("⚠️ 未等到科目列表 ({})，按无科目处理", e);
            return Ok(AttendanceReport::from_subjects(Vec::new()));
        }

        // 预先提取全部科目名称（点击展开会改变布局，必须先取名）
        let names = self.extract_subject_names(executor).await?;
        debug!("📝 预提取到 {} 个科目名称", names.len());

        let count_script = format!(
            "document.querySelectorAll({}).length",
            js_string(&self.selectors.expand_icon)
        );
        let icon_count: usize = executor.eval_as(count_script).await?;
        info!("🔍 找到 {} 个科目", icon_count);

        let mut subjects = Vec::new();
        let mut skipped = 0usize;

        // 按页面顺序逐行处理
        for index in 0..icon_count {
            let name = names
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("Subject {}", index + 1));

            match self.scrape_row(executor, index).await {
                Ok((conducted, attended)) => {
                    let record = SubjectRecord::new(name.clone(), conducted, attended);
                    if record.is_anomaly() {
                        // 门户偶尔会给出大于开课数的出勤数，保留原样并告警
                        warn!("⚠️ [{}] 数据异常: 出勤 {} > 开课 {}", name, attended, conducted);
                    }
                    info!("  ✓ {}: 开课 {}, 出勤 {}", name, conducted, attended);
                    subjects.push(record);
                }
                Err(e) => {
                    warn!("  ⚠️ [{}] 该行解析失败，跳过: {}", name, e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!("⚠️ 共跳过 {} 个无法解析的科目行", skipped);
        }

        Ok(AttendanceReport::from_subjects(subjects))
    }

    /// 展开第 index 行并读取开课 / 出勤数
    async fn scrape_row(&self, executor: &JsExecutor, index: usize) -> AppResult<(u32, u32)> {
        self.expand_row(executor, index).await?;
        sleep(std::time::Duration::from_millis(
            self.interaction_delay_ms.max(DETAIL_RENDER_DELAY_MS),
        ))
        .await;

        let conducted_text = self
            .read_visible_text(executor, &self.selectors.conducted_text)
            .await?
            .ok_or_else(|| AppError::row_parse_failed(index, "未找到开课数文本"))?;
        let conducted = parse_conducted_text(&conducted_text).ok_or_else(|| {
            AppError::row_parse_failed(index, format!("开课数不是数字: '{}'", conducted_text))
        })?;

        let attended_text = self
            .read_visible_text(executor, &self.selectors.attended_text)
            .await?
            .ok_or_else(|| AppError::row_parse_failed(index, "未找到出勤数文本"))?;
        let attended = parse_attended_text(&attended_text).ok_or_else(|| {
            AppError::row_parse_failed(index, format!("出勤数无法解析: '{}'", attended_text))
        })?;

        Ok((conducted, attended))
    }

    /// 滚动到第 index 个展开图标并点击
    async fn expand_row(&self, executor: &JsExecutor, index: usize) -> AppResult<()> {
        let js_code = format!(
            r#"
            (function() {{
                const icons = document.querySelectorAll({sel});
                if ({index} >= icons.length) return false;
                const icon = icons[{index}];
                icon.scrollIntoView({{ block: 'center' }});
                icon.click();
                return true;
            }})()
            "#,
            sel = js_string(&self.selectors.expand_icon),
            index = index,
        );

        let clicked: bool = executor.eval_as(js_code).await?;
        if !clicked {
            return Err(AppError::Scrape(ScrapeError::ExpandFailed { index }));
        }
        Ok(())
    }

    /// 读取选择器命中的最后一个可见元素的文本
    ///
    /// 展开多行后页面里会同时存在多份同名 span，最新展开的在最后
    async fn read_visible_text(
        &self,
        executor: &JsExecutor,
        selector: &str,
    ) -> AppResult<Option<String>> {
        let js_code = format!(
            r#"
            (function() {{
                const els = Array.from(document.querySelectorAll({sel}));
                for (let i = els.length - 1; i >= 0; i--) {{
                    const el = els[i];
                    if (el.offsetParent !== null && el.textContent.trim()) {{
                        return el.textContent.trim();
                    }}
                }}
                return null;
            }})()
            "#,
            sel = js_string(selector),
        );
        executor.eval_as(js_code).await
    }

    /// 在任何点击之前，预提取全部科目名称
    async fn extract_subject_names(&self, executor: &JsExecutor) -> AppResult<Vec<String>> {
        let js_code = format!(
            r#"
            (function() {{
                return Array.from(document.querySelectorAll({sel}))
                    .map(el => el.textContent.trim())
                    .filter(t => t.length > 10);
            }})()
            "#,
            sel = js_string(&self.selectors.subject_container),
        );
        let texts: Vec<String> = executor.eval_as(js_code).await?;

        let mut names = Vec::new();
        for text in &texts {
            if let Some(name) = parse_subject_name(text) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

// ========== 纯解析函数 ==========

/// 从容器文本中提取科目名称
///
/// 优先匹配课程编码模式（`21JUGE1111-DATA VISUALISATION` 取编码后的部分），
/// 失败时退化为"前缀含数字的 编码-名称"宽松切分
pub fn parse_subject_name(text: &str) -> Option<String> {
    if let Ok(re) = Regex::new(r"\d{2}[A-Z]{4}\d{4}-([A-Z\s&]+)") {
        if let Some(caps) = re.captures(text) {
            if let Some(matched) = caps.get(1) {
                let name = normalize_name(matched.as_str());
                if name_length_ok(&name) {
                    return Some(name);
                }
            }
        }
    }

    // 宽松切分：开头带数字编码、以 '-' 分隔
    if text.chars().take(15).any(|c| c.is_ascii_digit()) {
        if let Some((_, rest)) = text.split_once('-') {
            let name = normalize_name(rest);
            if name_length_ok(&name) {
                return Some(name);
            }
        }
    }

    None
}

/// 取首行并把连续空白压成单个空格
fn normalize_name(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or("");
    first_line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn name_length_ok(name: &str) -> bool {
    name.len() > 3 && name.len() < 50
}

/// 解析开课数文本（纯数字）
pub fn parse_conducted_text(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

/// 解析出勤数文本
///
/// 门户的格式形如 `P-12/E-1/L-0/MCR-0/R-0/Total-13`，取 Total 后的数字；
/// 也可能直接就是一个数字
pub fn parse_attended_text(text: &str) -> Option<u32> {
    let text = text.trim();

    if let Some((_, total_part)) = text.split_once("Total-") {
        let digits: String = total_part
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        return digits.parse().ok();
    }

    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subject_name_course_code() {
        assert_eq!(
            parse_subject_name("21JUGE1111-DATA VISUALISATION"),
            Some("DATA VISUALISATION".to_string())
        );
        assert_eq!(
            parse_subject_name("22BTRCS2044-DESIGN & ANALYSIS OF ALGORITHMS"),
            Some("DESIGN & ANALYSIS OF ALGORITHMS".to_string())
        );
    }

    #[test]
    fn test_parse_subject_name_keeps_first_line_only() {
        assert_eq!(
            parse_subject_name("21JUGE1111-DATA VISUALISATION\nConducted 20 Attended 18"),
            Some("DATA VISUALISATION".to_string())
        );
    }

    #[test]
    fn test_parse_subject_name_loose_fallback() {
        // 编码不满足严格模式，但仍是"数字开头 + 破折号"的结构
        assert_eq!(
            parse_subject_name("2025CS-Operating Systems"),
            Some("Operating Systems".to_string())
        );
    }

    #[test]
    fn test_parse_subject_name_rejects_noise() {
        assert_eq!(parse_subject_name("Welcome to the portal"), None);
        assert_eq!(parse_subject_name(""), None);
        // 名称过短
        assert_eq!(parse_subject_name("21JUGE1111-AB"), None);
    }

    #[test]
    fn test_parse_conducted_text() {
        assert_eq!(parse_conducted_text("20"), Some(20));
        assert_eq!(parse_conducted_text("  13 "), Some(13));
        assert_eq!(parse_conducted_text("abc"), None);
        assert_eq!(parse_conducted_text(""), None);
    }

    #[test]
    fn test_parse_attended_text_total_format() {
        assert_eq!(parse_attended_text("P-12/E-1/L-0/MCR-0/R-0/Total-13"), Some(13));
        assert_eq!(parse_attended_text("Total-7"), Some(7));
    }

    #[test]
    fn test_parse_attended_text_plain_number() {
        assert_eq!(parse_attended_text("18"), Some(18));
        assert_eq!(parse_attended_text(" 9 "), Some(9));
    }

    #[test]
    fn test_parse_attended_text_rejects_garbage() {
        assert_eq!(parse_attended_text("Total-"), None);
        assert_eq!(parse_attended_text("n/a"), None);
        assert_eq!(parse_attended_text(""), None);
    }
}
