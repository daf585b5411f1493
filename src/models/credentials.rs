use std::fmt;

/// 登录凭据
///
/// 只存在于进程内存中，进程退出即销毁，核心逻辑不做任何持久化
#[derive(Clone)]
pub struct Credentials {
    /// 学号
    pub student_code: String,
    /// 出生日期密码，格式 DDMMYYYY
    pub dob_password: String,
    /// LLM 服务的 API Key（验证码识别用）
    pub api_key: String,
}

// 手动实现 Debug，避免密码和 API Key 进入日志
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("student_code", &self.student_code)
            .field("dob_password", &"[hidden]")
            .field("api_key", &"[hidden]")
            .finish()
    }
}
