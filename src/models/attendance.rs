use serde::{Deserialize, Serialize};

/// 单个科目的考勤记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// 科目名称
    pub name: String,
    /// 开课节数
    pub conducted: u32,
    /// 出勤节数
    pub attended: u32,
}

impl SubjectRecord {
    /// 创建科目记录
    pub fn new(name: impl Into<String>, conducted: u32, attended: u32) -> Self {
        Self {
            name: name.into(),
            conducted,
            attended,
        }
    }

    /// 出勤数大于开课数，属于门户侧的数据异常
    ///
    /// 异常记录保留原样并在抓取阶段告警，不做任何"修正"
    pub fn is_anomaly(&self) -> bool {
        self.attended > self.conducted
    }

    /// 该科目的出勤率
    pub fn percentage(&self) -> Option<f64> {
        percentage(self.attended, self.conducted)
    }
}

/// 一次运行的考勤汇总
///
/// 由成功解析的科目记录一次性聚合而成，构造后不再变更；
/// 解析失败被跳过的行不计入列表，也不计入总和
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceReport {
    /// 按页面顺序排列的科目记录
    pub subjects: Vec<SubjectRecord>,
    /// 全部科目的开课节数之和
    pub overall_conducted: u32,
    /// 全部科目的出勤节数之和
    pub overall_attended: u32,
}

impl AttendanceReport {
    /// 从科目记录聚合出汇总
    pub fn from_subjects(subjects: Vec<SubjectRecord>) -> Self {
        let overall_conducted = subjects.iter().map(|s| s.conducted).sum();
        let overall_attended = subjects.iter().map(|s| s.attended).sum();
        Self {
            subjects,
            overall_conducted,
            overall_attended,
        }
    }

    /// 总体出勤率
    pub fn overall_percentage(&self) -> Option<f64> {
        percentage(self.overall_attended, self.overall_conducted)
    }

    /// 是否没有任何科目数据
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// 出勤状态分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// 出勤率达标
    Good,
    /// 出勤率偏低
    Warning,
    /// 出勤率告急
    Critical,
}

impl AttendanceStatus {
    /// 获取标准标签
    pub fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Good => "GOOD",
            AttendanceStatus::Warning => "WARNING",
            AttendanceStatus::Critical => "CRITICAL",
        }
    }

    /// 按阈值分类出勤率
    ///
    /// 判定使用 >=，恰好等于阈值视为达标
    pub fn classify(percent: f64, good_threshold: f64, warning_threshold: f64) -> Self {
        if percent >= good_threshold {
            AttendanceStatus::Good
        } else if percent >= warning_threshold {
            AttendanceStatus::Warning
        } else {
            AttendanceStatus::Critical
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 出勤率（百分比，保留一位小数）
///
/// `conducted` 为 0 时返回 `None`，调用方渲染为 "N/A"——
/// 区分"无数据"与"零出勤"，也避免除零
pub fn percentage(attended: u32, conducted: u32) -> Option<f64> {
    if conducted == 0 {
        return None;
    }
    let raw = attended as f64 / conducted as f64 * 100.0;
    Some((raw * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(18, 20), Some(90.0));
        assert_eq!(percentage(9, 15), Some(60.0));
        assert_eq!(percentage(27, 35), Some(77.1));
        assert_eq!(percentage(1, 3), Some(33.3));
    }

    #[test]
    fn test_percentage_zero_conducted_is_na() {
        // 0/0 是"无数据"，不是 0%，也不是错误
        assert_eq!(percentage(0, 0), None);
        assert_eq!(percentage(5, 0), None);
    }

    #[test]
    fn test_classify_boundaries_are_inclusive() {
        // 恰好等于阈值按达标算
        assert_eq!(AttendanceStatus::classify(75.0, 75.0, 65.0), AttendanceStatus::Good);
        assert_eq!(AttendanceStatus::classify(74.9, 75.0, 65.0), AttendanceStatus::Warning);
        assert_eq!(AttendanceStatus::classify(65.0, 75.0, 65.0), AttendanceStatus::Warning);
        assert_eq!(AttendanceStatus::classify(64.9, 75.0, 65.0), AttendanceStatus::Critical);
        assert_eq!(AttendanceStatus::classify(0.0, 75.0, 65.0), AttendanceStatus::Critical);
    }

    #[test]
    fn test_anomaly_is_flagged_not_fixed() {
        let record = SubjectRecord::new("PHYSICS", 10, 12);
        assert!(record.is_anomaly());
        // 数据保持原样
        assert_eq!(record.attended, 12);
        assert_eq!(record.conducted, 10);

        let normal = SubjectRecord::new("MATH", 10, 10);
        assert!(!normal.is_anomaly());
    }

    #[test]
    fn test_report_aggregates_sums() {
        let report = AttendanceReport::from_subjects(vec![
            SubjectRecord::new("MATH", 20, 18),
            SubjectRecord::new("PHYSICS", 15, 9),
        ]);

        assert_eq!(report.overall_conducted, 35);
        assert_eq!(report.overall_attended, 27);
        assert_eq!(report.overall_percentage(), Some(77.1));
    }

    #[test]
    fn test_empty_report() {
        let report = AttendanceReport::from_subjects(Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.overall_conducted, 0);
        assert_eq!(report.overall_attended, 0);
        assert_eq!(report.overall_percentage(), None);
    }

    #[test]
    fn test_anomalous_rows_still_count_into_sums() {
        let report = AttendanceReport::from_subjects(vec![
            SubjectRecord::new("MATH", 10, 12),
            SubjectRecord::new("PHYSICS", 10, 5),
        ]);
        assert_eq!(report.overall_conducted, 20);
        assert_eq!(report.overall_attended, 17);
    }
}
