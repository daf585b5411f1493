//! 报告构建 - 业务能力层
//!
//! 纯计算：对每个科目和总体算出勤率（保留一位小数），
//! 按阈值归类为 GOOD / WARNING / CRITICAL，没有任何副作用

use crate::config::Config;
use crate::models::{AttendanceReport, AttendanceStatus, ReportSummary, SubjectSummary};

/// 报告构建服务
pub struct ReportService {
    good_threshold: f64,
    warning_threshold: f64,
}

impl ReportService {
    /// 从配置创建服务
    pub fn new(config: &Config) -> Self {
        Self {
            good_threshold: config.good_threshold,
            warning_threshold: config.warning_threshold,
        }
    }

    /// 用显式阈值创建服务
    ///
    /// 同一进程里可以用不同阈值各建一个实例，互不影响
    pub fn with_thresholds(good_threshold: f64, warning_threshold: f64) -> Self {
        Self {
            good_threshold,
            warning_threshold,
        }
    }

    /// 构建渲染用的汇总报告
    pub fn build(&self, report: &AttendanceReport) -> ReportSummary {
        let subjects = report
            .subjects
            .iter()
            .map(|record| {
                let percent = record.percentage();
                SubjectSummary {
                    name: record.name.clone(),
                    conducted: record.conducted,
                    attended: record.attended,
                    percent,
                    status: percent.map(|p| self.classify(p)),
                    anomaly: record.is_anomaly(),
                }
            })
            .collect();

        let overall_percent = report.overall_percentage();
        ReportSummary {
            subjects,
            overall_conducted: report.overall_conducted,
            overall_attended: report.overall_attended,
            overall_percent,
            overall_status: overall_percent.map(|p| self.classify(p)),
        }
    }

    fn classify(&self, percent: f64) -> AttendanceStatus {
        AttendanceStatus::classify(percent, self.good_threshold, self.warning_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectRecord;

    #[test]
    fn test_build_classifies_each_subject() {
        let report = AttendanceReport::from_subjects(vec![
            SubjectRecord::new("Math", 20, 18),
            SubjectRecord::new("Physics", 15, 9),
        ]);
        let service = ReportService::with_thresholds(75.0, 65.0);

        let summary = service.build(&report);

        assert_eq!(summary.subjects.len(), 2);
        assert_eq!(summary.subjects[0].percent, Some(90.0));
        assert_eq!(summary.subjects[0].status, Some(AttendanceStatus::Good));
        assert_eq!(summary.subjects[1].percent, Some(60.0));
        assert_eq!(summary.subjects[1].status, Some(AttendanceStatus::Critical));

        // 总和只包含成功解析的行
        assert_eq!(summary.overall_conducted, 35);
        assert_eq!(summary.overall_attended, 27);
        assert_eq!(summary.overall_percent, Some(77.1));
        assert_eq!(summary.overall_status, Some(AttendanceStatus::Good));
    }

    #[test]
    fn test_build_empty_report_has_no_percent() {
        let report = AttendanceReport::from_subjects(Vec::new());
        let service = ReportService::with_thresholds(75.0, 65.0);

        let summary = service.build(&report);

        assert!(summary.subjects.is_empty());
        assert_eq!(summary.overall_percent, None);
        assert_eq!(summary.overall_status, None);
    }

    #[test]
    fn test_build_threshold_boundary_counts_as_met() {
        let report = AttendanceReport::from_subjects(vec![SubjectRecord::new("Math", 4, 3)]);
        let service = ReportService::with_thresholds(75.0, 65.0);

        let summary = service.build(&report);

        // 3/4 = 75.0%，恰好等于 good 阈值
        assert_eq!(summary.subjects[0].percent, Some(75.0));
        assert_eq!(summary.subjects[0].status, Some(AttendanceStatus::Good));
    }

    #[test]
    fn test_build_zero_conducted_subject_is_na_not_zero() {
        let report = AttendanceReport::from_subjects(vec![SubjectRecord::new("Seminar", 0, 0)]);
        let service = ReportService::with_thresholds(75.0, 65.0);

        let summary = service.build(&report);

        assert_eq!(summary.subjects[0].percent, None);
        assert_eq!(summary.subjects[0].status, None);
    }

    #[test]
    fn test_build_marks_anomalies() {
        let report = AttendanceReport::from_subjects(vec![SubjectRecord::new("Physics", 10, 12)]);
        let service = ReportService::with_thresholds(75.0, 65.0);

        let summary = service.build(&report);

        assert!(summary.subjects[0].anomaly);
        // 异常行照常参与计算
        assert_eq!(summary.subjects[0].percent, Some(120.0));
    }

    #[test]
    fn test_independent_thresholds_in_one_process() {
        let report = AttendanceReport::from_subjects(vec![SubjectRecord::new("Math", 10, 7)]);

        let strict = ReportService::with_thresholds(90.0, 80.0);
        let lenient = ReportService::with_thresholds(70.0, 50.0);

        assert_eq!(
            strict.build(&report).subjects[0].status,
            Some(AttendanceStatus::Critical)
        );
        assert_eq!(
            lenient.build(&report).subjects[0].status,
            Some(AttendanceStatus::Good)
        );
    }
}
