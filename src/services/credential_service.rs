//! 凭据解析 - 业务能力层
//!
//! 解析顺序（逐项）：显式配置 → 环境变量 → 终端交互输入
//!
//! 非交互环境（stdin 不是终端）下仍缺失的项直接报 Missing，
//! 除读取环境变量和终端提示外没有任何副作用

use std::io::{self, IsTerminal, Write};

use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult, CredentialError};
use crate::models::Credentials;

/// API Key 的候选环境变量，按序查找
const API_KEY_ENV_VARS: [&str; 2] = ["LLM_API_KEY", "GEMINI_API_KEY"];

/// 凭据解析器
pub struct CredentialResolver {
    default_student_code: String,
    default_dob_password: String,
    default_api_key: String,
}

impl CredentialResolver {
    /// 从配置创建解析器
    pub fn new(config: &Config) -> Self {
        Self {
            default_student_code: config.default_student_code.clone(),
            default_dob_password: config.default_dob_password.clone(),
            default_api_key: config.default_api_key.clone(),
        }
    }

    /// 解析全部凭据
    pub fn resolve(&self) -> AppResult<Credentials> {
        info!("🔑 正在解析登录凭据...");

        let student_code =
            self.resolve_field("学号", "STUDENT_CODE", &self.default_student_code, false)?;
        let dob_password = self.resolve_field(
            "密码 (DDMMYYYY)",
            "DOB_PASSWORD",
            &self.default_dob_password,
            true,
        )?;
        let api_key = self.resolve_api_key()?;

        info!("✅ 凭据解析完成");
        Ok(Credentials {
            student_code,
            dob_password,
            api_key,
        })
    }

    /// 按 配置 → 环境变量 → 交互输入 的顺序解析单项凭据
    fn resolve_field(
        &self,
        label: &str,
        env_var: &str,
        config_value: &str,
        masked: bool,
    ) -> AppResult<String> {
        if !config_value.trim().is_empty() {
            info!("使用配置提供的{}", label);
            return Ok(config_value.trim().to_string());
        }

        if let Ok(value) = std::env::var(env_var) {
            if !value.trim().is_empty() {
                info!("使用环境变量 {} 提供的{}", env_var, label);
                return Ok(value.trim().to_string());
            }
        }

        prompt(label, env_var, masked)
    }

    /// API Key 额外支持多个环境变量名
    fn resolve_api_key(&self) -> AppResult<String> {
        if !self.default_api_key.trim().is_empty() {
            info!("使用配置提供的 API Key");
            return Ok(self.default_api_key.trim().to_string());
        }

        for var in API_KEY_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    info!("使用环境变量 {} 提供的 API Key", var);
                    return Ok(value.trim().to_string());
                }
            }
        }

        prompt("API Key", "LLM_API_KEY", true)
    }
}

/// 终端交互输入
///
/// 密码类输入走掩码读取，不回显
fn prompt(label: &str, field: &str, masked: bool) -> AppResult<String> {
    if !io::stdin().is_terminal() {
        return Err(AppError::missing_credential(field));
    }

    let value = if masked {
        rpassword::prompt_password(format!("请输入{}: ", label)).map_err(|e| {
            AppError::Credential(CredentialError::PromptFailed { source: Box::new(e) })
        })?
    } else {
        print!("请输入{}: ", label);
        io::stdout().flush().map_err(|e| {
            AppError::Credential(CredentialError::PromptFailed { source: Box::new(e) })
        })?;
        let mut line = String::new();
        io::stdin().read_line(&mut line).map_err(|e| {
            AppError::Credential(CredentialError::PromptFailed { source: Box::new(e) })
        })?;
        line
    };

    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::missing_credential(field));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, CredentialError};

    fn resolver_with(code: &str, password: &str, api_key: &str) -> CredentialResolver {
        let mut config = Config::default();
        config.default_student_code = code.to_string();
        config.default_dob_password = password.to_string();
        config.default_api_key = api_key.to_string();
        CredentialResolver::new(&config)
    }

    #[test]
    fn test_config_values_win() {
        let resolver = resolver_with("21BTRCA001", "01012003", "sk-test");
        let credentials = resolver.resolve().unwrap();
        assert_eq!(credentials.student_code, "21BTRCA001");
        assert_eq!(credentials.dob_password, "01012003");
        assert_eq!(credentials.api_key, "sk-test");
    }

    #[test]
    fn test_missing_field_fails_when_not_interactive() {
        // cargo test 的 stdin 不是终端，缺失项必须直接报错而不是挂起等待输入
        let resolver = resolver_with("", "01012003", "sk-test");
        let err = resolver.resolve().unwrap_err();
        match err {
            AppError::Credential(CredentialError::Missing { field }) => {
                assert_eq!(field, "STUDENT_CODE");
            }
            other => panic!("预期 Missing 错误，实际: {}", other),
        }
    }

    #[test]
    fn test_config_values_are_trimmed() {
        let resolver = resolver_with(" 21BTRCA001 ", " 01012003 ", " sk-test ");
        let credentials = resolver.resolve().unwrap();
        assert_eq!(credentials.student_code, "21BTRCA001");
        assert_eq!(credentials.dob_password, "01012003");
        assert_eq!(credentials.api_key, "sk-test");
    }
}
