pub mod attendance_flow;

pub use attendance_flow::AttendanceFlow;
