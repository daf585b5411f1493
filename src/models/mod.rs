pub mod attendance;
pub mod credentials;
pub mod report;

pub use attendance::{percentage, AttendanceReport, AttendanceStatus, SubjectRecord};
pub use credentials::Credentials;
pub use report::{ReportSummary, SubjectSummary};
