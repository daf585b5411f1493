use std::fmt;

use super::attendance::AttendanceStatus;

/// 单个科目的汇总行
#[derive(Debug, Clone)]
pub struct SubjectSummary {
    pub name: String,
    pub conducted: u32,
    pub attended: u32,
    /// 出勤率；开课数为 0 时为 None，渲染为 N/A
    pub percent: Option<f64>,
    pub status: Option<AttendanceStatus>,
    /// 出勤数大于开课数的数据异常标记
    pub anomaly: bool,
}

/// 渲染用的汇总报告
///
/// 纯数据，`Display` 负责排版；空列表与零出勤分别渲染
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub subjects: Vec<SubjectSummary>,
    pub overall_conducted: u32,
    pub overall_attended: u32,
    pub overall_percent: Option<f64>,
    pub overall_status: Option<AttendanceStatus>,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "📊 考勤汇总报告")?;
        writeln!(f, "{}", "=".repeat(60))?;

        if self.subjects.is_empty() {
            writeln!(f, "未找到任何科目记录")?;
        } else {
            for (i, subject) in self.subjects.iter().enumerate() {
                let status = subject.status.map(|s| s.label()).unwrap_or("N/A");
                let anomaly_mark = if subject.anomaly { " ⚠️ 数据异常" } else { "" };
                writeln!(
                    f,
                    "{:>2}. {}: {}/{} ({}) [{}]{}",
                    i + 1,
                    subject.name,
                    subject.attended,
                    subject.conducted,
                    fmt_percent(subject.percent),
                    status,
                    anomaly_mark
                )?;
            }
        }

        writeln!(f, "{}", "-".repeat(60))?;
        match self.overall_percent {
            Some(percent) => {
                let status = self.overall_status.map(|s| s.label()).unwrap_or("N/A");
                writeln!(
                    f,
                    "总体出勤: {}/{} ({:.1}%) [{}]",
                    self.overall_attended, self.overall_conducted, percent, status
                )?;
            }
            None => {
                writeln!(f, "总体出勤: 无数据 (N/A)")?;
            }
        }
        write!(f, "{}", "=".repeat(60))
    }
}

fn fmt_percent(percent: Option<f64>) -> String {
    match percent {
        Some(value) => format!("{:.1}%", value),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_distinguishes_no_data_from_zero_attendance() {
        let no_data = ReportSummary {
            subjects: Vec::new(),
            overall_conducted: 0,
            overall_attended: 0,
            overall_percent: None,
            overall_status: None,
        };
        let rendered = no_data.to_string();
        assert!(rendered.contains("未找到任何科目记录"));
        assert!(rendered.contains("N/A"));
        assert!(!rendered.contains("0.0%"));

        let zero_attendance = ReportSummary {
            subjects: vec![SubjectSummary {
                name: "MATH".to_string(),
                conducted: 10,
                attended: 0,
                percent: Some(0.0),
                status: Some(AttendanceStatus::Critical),
                anomaly: false,
            }],
            overall_conducted: 10,
            overall_attended: 0,
            overall_percent: Some(0.0),
            overall_status: Some(AttendanceStatus::Critical),
        };
        let rendered = zero_attendance.to_string();
        assert!(rendered.contains("0.0%"));
        assert!(rendered.contains("[CRITICAL]"));
    }

    #[test]
    fn test_render_marks_anomalies() {
        let summary = ReportSummary {
            subjects: vec![SubjectSummary {
                name: "PHYSICS".to_string(),
                conducted: 10,
                attended: 12,
                percent: Some(120.0),
                status: Some(AttendanceStatus::Good),
                anomaly: true,
            }],
            overall_conducted: 10,
            overall_attended: 12,
            overall_percent: Some(120.0),
            overall_status: Some(AttendanceStatus::Good),
        };
        assert!(summary.to_string().contains("数据异常"));
    }
}
